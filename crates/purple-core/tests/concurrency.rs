// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Multi-threaded require tests

mod common;

use common::{id, loader, Scripts};
use purple_core::module_system::ExportOrigin;
use purple_core::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[test]
fn test_concurrent_require_evaluates_once() {
    let scripts = Scripts::new();
    scripts.define("slow", |scope| {
        thread::sleep(Duration::from_millis(50));
        scope.export("ready", true)?;
        Ok(())
    });
    let loader = loader(&[("/app/slow.js", "slow")], &scripts);
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let loader = loader.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                loader.require("./slow", &id("/app/main.js")).unwrap()
            })
        })
        .collect();

    let results: Vec<Value> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(scripts.runs("/app/slow.js"), 1);
    for exports in &results {
        assert!(exports.same(&results[0]));
        assert_eq!(exports.get("ready"), Value::Boolean(true));
    }
}

#[test]
fn test_waiter_retries_after_failed_load() {
    let scripts = Scripts::new();
    let started = Arc::new(Barrier::new(2));
    let failed_once = Arc::new(AtomicBool::new(false));
    {
        let started = Arc::clone(&started);
        let failed_once = Arc::clone(&failed_once);
        scripts.define("flaky", move |scope| {
            if !failed_once.swap(true, Ordering::SeqCst) {
                started.wait();
                thread::sleep(Duration::from_millis(50));
                return Err("first attempt fails".into());
            }
            scope.export("attempt", 2.0)?;
            Ok(())
        });
    }
    let loader = loader(&[("/app/flaky.js", "flaky")], &scripts);

    let owner = {
        let loader = loader.clone();
        thread::spawn(move || loader.require("./flaky", &id("/app/main.js")))
    };
    started.wait();
    let waiter = {
        let loader = loader.clone();
        thread::spawn(move || loader.require_traced("./flaky", &id("/app/main.js")))
    };

    assert!(owner.join().unwrap().unwrap_err().is_evaluation());
    let required = waiter.join().unwrap().unwrap();
    assert_eq!(required.origin, ExportOrigin::Evaluated);
    assert_eq!(required.exports.get("attempt"), Value::Number(2.0));
    assert_eq!(scripts.runs("/app/flaky.js"), 2);
}

#[test]
fn test_mock_registration_visible_across_threads() {
    let scripts = Scripts::new();
    let loader = loader(&[], &scripts);

    let registrar = {
        let loader = loader.clone();
        thread::spawn(move || loader.register_mock("/app/fake.js", Value::from("mocked")).unwrap())
    };
    registrar.join().unwrap();

    let reader = {
        let loader = loader.clone();
        thread::spawn(move || loader.require("./fake", &id("/app/main.js")).unwrap())
    };
    assert_eq!(reader.join().unwrap(), Value::from("mocked"));
}

#[test]
fn test_require_cycle_across_threads_completes() {
    let scripts = Scripts::new();
    let both_started = Arc::new(Barrier::new(2));
    for (name, peer) in [("a", "./b"), ("b", "./a")] {
        let both_started = Arc::clone(&both_started);
        scripts.define(name, move |scope| {
            scope.export("name", name)?;
            both_started.wait();
            let other = scope.require().call(peer)?;
            scope.export("peer", other.get("name"))?;
            Ok(())
        });
    }
    let loader = loader(&[("/app/a.js", "a"), ("/app/b.js", "b")], &scripts);

    let (done_tx, done_rx) = mpsc::channel();
    for path in ["/app/a.js", "/app/b.js"] {
        let loader = loader.clone();
        let done_tx = done_tx.clone();
        thread::spawn(move || {
            let _ = done_tx.send((path, loader.require_main(path)));
        });
    }

    let mut peers = Vec::new();
    for _ in 0..2 {
        let (path, result) = done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("require cycle across threads did not finish");
        peers.push((path, result.unwrap().get("peer")));
    }
    peers.sort_by_key(|(path, _)| *path);

    assert_eq!(peers[0], ("/app/a.js", Value::from("b")));
    assert_eq!(peers[1], ("/app/b.js", Value::from("a")));
    assert_eq!(scripts.runs("/app/a.js"), 1);
    assert_eq!(scripts.runs("/app/b.js"), 1);
}
