//! Insert and replace command implementations.

use super::{CliResult, Context, HandleTask};
use docvault_core::{ConnectionHandle, WriteMode, WriteOptions, WriteOutcome, Writer};
use docvault_store::{documents_from_json, Connector, Document};
use std::fs;
use std::path::Path;
use tracing::info;

/// Reads a JSON array of objects.
pub fn load_batch(path: &Path) -> CliResult<Vec<Document>> {
    let text = fs::read_to_string(path)?;
    let json: serde_json::Value = serde_json::from_str(&text)?;
    Ok(documents_from_json(json)?)
}

struct WriteBatch {
    documents: Vec<Document>,
    mode: WriteMode,
    options: WriteOptions,
}

impl HandleTask for WriteBatch {
    type Output = ();

    fn run<C: Connector>(self, handle: ConnectionHandle<C>) -> CliResult<()> {
        let result = Writer::new(&handle).write(self.documents, self.mode, self.options);
        let report = match result {
            Ok(report) => report,
            Err(err) => {
                match err.outcome() {
                    Some(WriteOutcome::Restored) => {
                        println!("✗ Write failed; collection restored to its previous state");
                    }
                    Some(WriteOutcome::RestoreFailed) => {
                        println!("✗ Write failed and the restore failed too");
                    }
                    Some(WriteOutcome::Committed) | None => println!("✗ Write not performed"),
                }
                if let Some(backup) = err.preserved_backup() {
                    println!("  Original data preserved in: {backup}");
                }
                return Err(err.into());
            }
        };

        println!("✓ Write {}", report.outcome);
        println!("  Collection: {}", report.namespace);
        println!("  Mode: {}", report.mode);
        println!("  Documents before: {}", report.previous);
        println!("  Documents inserted: {}", report.inserted);
        if let Some(backup) = &report.backup {
            println!("  Backup: {backup}");
        }
        Ok(())
    }
}

/// Runs the insert or replace command.
pub fn run(
    ctx: &Context,
    database: &str,
    collection: &str,
    file: &Path,
    mode: WriteMode,
    preserve_backup: bool,
) -> CliResult<()> {
    info!("Loading batch from {:?}", file);
    let documents = load_batch(file)?;
    let task = WriteBatch {
        documents,
        mode,
        options: WriteOptions::new().preserve_backup(preserve_backup),
    };
    ctx.with_handle(Some(database), Some(collection), task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Backend;
    use docvault_core::CredentialSet;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> Context {
        let ctx = Context::new(
            Some(dir.path().join("config.toml")),
            Some(dir.path().join("store")),
            Backend::File,
            CredentialSet::new().with_cluster("local"),
        )
        .unwrap();
        ctx.file_connector().init_cluster("local").unwrap();
        crate::commands::create::run(&ctx, "shop", "orders").unwrap();
        ctx
    }

    #[test]
    fn load_batch_requires_array_of_objects() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.json");
        fs::write(&good, r#"[{"_id": 1, "v": "a"}, {"v": "b"}]"#).unwrap();
        assert_eq!(load_batch(&good).unwrap().len(), 2);

        let bad = dir.path().join("bad.json");
        fs::write(&bad, r#"{"v": "a"}"#).unwrap();
        assert!(load_batch(&bad).is_err());
    }

    #[test]
    fn insert_then_duplicate_fails() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let file = dir.path().join("batch.json");
        fs::write(&file, r#"[{"_id": 1, "v": "a"}]"#).unwrap();

        run(&ctx, "shop", "orders", &file, WriteMode::Append, false).unwrap();
        assert!(run(&ctx, "shop", "orders", &file, WriteMode::Append, false).is_err());
        run(&ctx, "shop", "orders", &file, WriteMode::ReplaceAll, false).unwrap();
    }
}
