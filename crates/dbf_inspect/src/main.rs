use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use dbf_reader::{DbfFileReader, DbfReaderConfig, FieldDescriptor, FileHeader};
use serde::Serialize;

const USAGE: &str = "Usage: dbf_inspect <file.dbf> [--json] [--all]";

#[derive(Debug)]
struct Options {
    path: PathBuf,
    json: bool,
    include_deleted: bool,
}

fn parse_args<I: Iterator<Item = String>>(args: I) -> Result<Options> {
    let mut path = None;
    let mut json = false;
    let mut include_deleted = false;

    for arg in args {
        match arg.as_str() {
            "--json" => json = true,
            "--all" => include_deleted = true,
            flag if flag.starts_with("--") => bail!("Unknown option {flag}\n{USAGE}"),
            _ if path.is_none() => path = Some(PathBuf::from(&arg)),
            _ => bail!("Unexpected argument {arg}\n{USAGE}"),
        }
    }

    let Some(path) = path else {
        bail!(USAGE);
    };
    Ok(Options {
        path,
        json,
        include_deleted,
    })
}

#[derive(Serialize)]
struct TableDescription<'a> {
    header: &'a FileHeader,
    last_modified: Option<String>,
    fields: &'a [FieldDescriptor],
}

fn print_description(reader: &DbfFileReader, json: bool) -> Result<()> {
    let header = reader.header()?;
    let fields = reader.fields()?;

    if json {
        let description = TableDescription {
            header,
            last_modified: header.last_modified_date().map(|d| d.to_string()),
            fields,
        };
        println!("{}", serde_json::to_string_pretty(&description)?);
        return Ok(());
    }

    println!(
        "{:?} table, {} records of {} bytes, header {} bytes",
        header.dialect(),
        header.record_count,
        header.record_length,
        header.header_length
    );
    if let Some(date) = header.last_modified_date() {
        println!("Last modified {date}");
    }
    for field in fields {
        println!(
            "  {:<11} {} {:>3},{:<2} @ {}",
            field.name,
            field.field_type.code() as char,
            field.length,
            field.decimals,
            field.byte_offset
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let options = parse_args(std::env::args().skip(1))?;
    let mut reader = DbfFileReader::from_path_with_config(&options.path, DbfReaderConfig::from_env())
        .with_context(|| format!("Failed to open {}", options.path.display()))?;

    print_description(&reader, options.json)?;
    if options.json {
        return Ok(());
    }

    let field_count = reader.field_count()?;
    let mut shown = 0u64;
    let mut deleted = 0u64;
    while reader.next()? {
        let is_deleted = reader.is_deleted_row()?;
        if is_deleted {
            deleted += 1;
            if !options.include_deleted {
                continue;
            }
        }

        let values = (0..field_count)
            .map(|i| reader.get_string(i))
            .collect::<Result<Vec<_>, _>>()?;
        println!("{}{}", if is_deleted { "*" } else { "" }, values.join("\t"));
        shown += 1;
    }
    reader.close();

    log::info!("Printed {shown} rows, {deleted} deleted rows in file");
    Ok(())
}
