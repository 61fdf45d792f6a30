//! Archive fixtures built in-test; no binary fixtures are checked in.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Entries written into a zip in insertion order.
pub struct ZipFixture {
    method: CompressionMethod,
    entries: Vec<(String, Vec<u8>)>,
}

impl ZipFixture {
    pub fn stored() -> Self {
        Self {
            method: CompressionMethod::Stored,
            entries: Vec::new(),
        }
    }

    pub fn deflated() -> Self {
        Self {
            method: CompressionMethod::Deflated,
            entries: Vec::new(),
        }
    }

    pub fn file(mut self, name: &str, body: impl AsRef<[u8]>) -> Self {
        self.entries.push((name.to_string(), body.as_ref().to_vec()));
        self
    }

    /// Write the archive as `<dir>/<name>`.
    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let mut writer = ZipWriter::new(File::create(&path).unwrap());
        let options = FileOptions::default().compression_method(self.method);
        for (entry_name, body) in &self.entries {
            writer.start_file(entry_name.as_str(), options).unwrap();
            writer.write_all(body).unwrap();
        }
        writer.finish().unwrap();
        path
    }
}

pub const MAIN_JAVA: &str = "package com.shop.app;\n\nimport com.shop.app.service.OrderService;\n\npublic class Main {\n    public static void main(String[] args) {}\n}\n";

pub const SERVICE_JAVA: &str = "package com.shop.app.service;\n\nimport org.springframework.stereotype.Service;\n\n@Service\npublic class OrderService {}\n";

pub const README: &str = "# shop\n\nSample application.\n";

pub const GEMFILE: &str = "source 'https://rubygems.org'\n\ngem 'rails', '~> 7.1'\ngem 'pg'\n";

pub const APP_PY: &str = "from flask import Flask\n\napp = Flask(__name__)\n\n@app.route('/health')\ndef health():\n    return 'ok'\n";
