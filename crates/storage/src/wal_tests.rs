// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use shop_core::{Money, Product, ProductId, User, UserId};

#[test]
fn wal_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");

    {
        let mut wal = Wal::open(&path).unwrap();
        wal.append(&StoreOp::SaveUser(User::new(UserId(1), "ada")))
            .unwrap();
        wal.append(&StoreOp::SaveProduct(Product::new(
            ProductId(1),
            "lamp",
            Money(2_000),
            5,
        )))
        .unwrap();
    }

    let ops = Wal::replay(&path).unwrap();
    assert_eq!(ops.len(), 2);
    assert!(matches!(ops[0], StoreOp::SaveUser(_)));
    assert!(matches!(ops[1], StoreOp::SaveProduct(_)));
}

#[test]
fn wal_sequence_continues() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");

    {
        let mut wal = Wal::open(&path).unwrap();
        assert_eq!(wal.sequence(), 0);
        wal.append(&StoreOp::SaveUser(User::new(UserId(1), "ada")))
            .unwrap();
        assert_eq!(wal.sequence(), 1);
    }

    {
        let wal = Wal::open(&path).unwrap();
        assert_eq!(wal.sequence(), 1);
    }
}

#[test]
fn wal_replay_nonexistent() {
    let path = Path::new("/nonexistent/path/wal");
    let ops = Wal::replay(path).unwrap();
    assert!(ops.is_empty());
}

#[test]
fn wal_open_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/state/shop.wal");

    Wal::open(&path).unwrap();
    assert!(path.exists());
}

#[test]
fn wal_replay_reports_corrupt_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");
    {
        let mut wal = Wal::open(&path).unwrap();
        wal.append(&StoreOp::SaveUser(User::new(UserId(1), "ada")))
            .unwrap();
    }
    std::fs::OpenOptions::new()
        .append(true)
        .open(&path)
        .and_then(|mut f| writeln!(f, "{{truncated"))
        .unwrap();

    let err = Wal::replay(&path).unwrap_err();
    assert!(matches!(err, WalError::Corrupt { line: 2, .. }), "{err}");
}
