//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const HEADER: &str = "SECID,TRADETIME,PRICE,QUANTITY\n";

pub fn trade_file(dir: &Path, name: &str, prices: &[&str]) {
    let mut content = HEADER.to_string();
    for (i, price) in prices.iter().enumerate() {
        content.push_str(&format!("X,10:00:{i:02},{price},1\n"));
    }
    fs::write(dir.join(name), content).unwrap();
}

/// Five instruments: A=50%, B=0, C=33.33%, D=10%, E=0 (empty)
pub fn ranked_fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    let p = dir.path();
    trade_file(p, "A.csv", &["75", "125"]);
    trade_file(p, "B.csv", &["42.5", "42.5", "42.5"]);
    trade_file(p, "C.csv", &["100", "140"]);
    trade_file(p, "D.csv", &["95", "105", "100"]);
    trade_file(p, "E.csv", &[]);
    dir
}

pub const RANKED_REPORT: &str = "\
Максимальная волатильность:
    A - 50.00 %
    C - 33.33 %
    D - 10.00 %
Минимальная волатильность:
    A - 50.00 %
    C - 33.33 %
    D - 10.00 %
Нулевая волатильность:
    B
    E
";
