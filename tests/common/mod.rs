#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Adarsh export: comma separated, `Qty` for stock, dollar prices.
pub const ADARSH_CSV: &str = "\
ISBN,Book Title,Author,Publisher,Qty,Currency,Price
978-0-13-468599-1,The Rust Programming Language,Klabnik,No Starch,12,$,10
978-1-4919-2728-1,Programming Rust,Blandy,O'Reilly,5,$,20
978-1-59327-828-1,Rust for Rustaceans,Gjengset,No Starch,15,£,30
";

/// GBD export: semicolon separated, repeats one Adarsh ISBN without dashes.
pub const GBD_CSV: &str = "\
isbn;title;stock;cur;rate
9780134685991;The Rust Programming Language (GBD);40;INR;700
978-0-00-000000-2;Zero Priced;9;EUR;0
978-0-00-000000-3;Euro Book;9;EUR;12
";

pub const ADARSH_MAPPING: &str = "    mapping:
      - column: ISBN
        field: ISBN
      - column: Book Title
        field: TITLE
      - column: Author
        field: AUTHOR
      - column: Publisher
        field: PUBLISHER
      - column: Qty
        field: STOCK
      - column: Currency
        field: CURRENCY
      - column: Price
        field: PRICE
";

pub const GBD_MAPPING: &str = "    delimiter: ';'
    mapping:
      - column: isbn
        field: ISBN
      - column: title
        field: TITLE
      - column: stock
        field: STOCK
      - column: cur
        field: CURRENCY
      - column: rate
        field: PRICE
";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes a manifest from `(file, company, mapping block)` entries.
    pub fn write_manifest(&self, name: &str, entries: &[(&str, &str, &str)]) -> PathBuf {
        let mut yaml = String::from("sources:\n");
        for (file, company, mapping) in entries {
            yaml.push_str(&format!("  - path: {file}\n    company: {company}\n"));
            yaml.push_str(mapping);
        }
        self.write(name, &yaml)
    }

    /// Both supplier exports plus a manifest listing Adarsh before GBD.
    pub fn sample_run(&self) -> PathBuf {
        self.write("adarsh.csv", ADARSH_CSV);
        self.write("gbd.csv", GBD_CSV);
        self.write_manifest(
            "manifest.yaml",
            &[
                ("adarsh.csv", "Adarsh", ADARSH_MAPPING),
                ("gbd.csv", "GBD", GBD_MAPPING),
            ],
        )
    }
}
