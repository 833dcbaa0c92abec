//! Read command implementation.

use super::{CliResult, Context, HandleTask, OutputFormat};
use docvault_core::{ConnectionHandle, Query, Reader, Table};
use docvault_store::{Connector, Document, Filter};
use tracing::info;

/// Parses a filter given as a JSON object.
pub fn parse_filter(text: &str) -> CliResult<Filter> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    Ok(Filter::from_document(Document::from_json(json)?))
}

struct Read {
    query: Query,
    include_id: bool,
    format: OutputFormat,
}

impl HandleTask for Read {
    type Output = String;

    fn run<C: Connector>(self, handle: ConnectionHandle<C>) -> CliResult<String> {
        let documents = Reader::new(&handle)
            .with_id(self.include_id)
            .get_data(&self.query)?;
        render(&documents, self.format)
    }
}

fn render(documents: &[Document], format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::Value::Array(documents.iter().map(Document::to_json).collect());
            Ok(serde_json::to_string_pretty(&json)?)
        }
        OutputFormat::Table => Ok(Table::from_documents(documents).to_string()),
    }
}

/// Runs the read command.
pub fn run(
    ctx: &Context,
    database: &str,
    collection: &str,
    filter: Option<&str>,
    fields: Option<Vec<String>>,
    include_id: bool,
    format: OutputFormat,
) -> CliResult<()> {
    info!("Reading from {database}.{collection}");
    let mut query = Query::all();
    if let Some(filter) = filter {
        query = query.with_filter(parse_filter(filter)?);
    }
    if let Some(fields) = fields {
        query = query.with_fields(fields);
    }

    let task = Read {
        query,
        include_id,
        format,
    };
    let output = ctx.with_handle(Some(database), Some(collection), task)?;
    println!("{}", output.trim_end());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docvault_store::{doc, Value};

    #[test]
    fn filter_from_json() {
        let filter = parse_filter(r#"{"team": "core", "level": 2}"#).unwrap();
        assert!(filter.matches(&doc! { "team" => "core", "level" => 2 }).unwrap());
        assert!(!filter.matches(&doc! { "team" => "web", "level" => 2 }).unwrap());
        assert!(parse_filter("[1]").is_err());
    }

    #[test]
    fn renders_json_and_table() {
        let docs = vec![doc! { "name" => "ada", "n" => 1 }, doc! { "name" => "bob", "n" => Value::Null }];

        let json = render(&docs, OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["name"], "ada");

        let table = render(&docs, OutputFormat::Table).unwrap();
        assert!(table.starts_with("name  n"));
    }
}
