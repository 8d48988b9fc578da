//! Hygiene: source rules for the annotation engine.
//!
//! The engine runs in the background while the student works. A panic in a
//! pass kills the notebook; a swallowed error leaves stale markers with no
//! log line to explain them; a pass flag released by the wrong caller lets
//! two passes write the page at once. Plain pattern budgets cover the first
//! two, line checks cover the lock and guard rules.

use std::fs;
use std::path::{Path, PathBuf};

type Source = (PathBuf, String);

/// (pattern, budget)
const BUDGETS: &[(&str, usize)] = &[
    (".unwrap()", 0),
    (".expect(", 0),
    ("panic!(", 0),
    ("unreachable!(", 0),
    ("todo!(", 0),
    ("unimplemented!(", 0),
    ("let _ =", 0),
    (".ok()", 0),
    ("#[allow(dead_code)]", 0),
    ("println!(", 0),
    ("eprintln!(", 0),
];

fn sources() -> Vec<Source> {
    fn walk(dir: &Path, out: &mut Vec<Source>) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(&path, out);
            } else if path.extension().is_some_and(|e| e == "rs") && !path.to_string_lossy().ends_with("_test.rs") {
                if let Ok(content) = fs::read_to_string(&path) {
                    out.push((path, content));
                }
            }
        }
    }
    let mut out = Vec::new();
    walk(Path::new("src"), &mut out);
    out
}

fn offending_lines(files: &[Source], bad: impl Fn(&str) -> bool) -> Vec<String> {
    files
        .iter()
        .flat_map(|(path, content)| {
            content
                .lines()
                .enumerate()
                .filter(|(_, line)| bad(line))
                .map(|(n, line)| format!("  {}:{}: {}", path.display(), n + 1, line.trim()))
                .collect::<Vec<_>>()
        })
        .collect()
}

#[test]
fn pattern_budgets() {
    let files = sources();
    assert!(!files.is_empty(), "no sources found under src/");
    for (pattern, budget) in BUDGETS {
        let hits = offending_lines(&files, |line| line.contains(pattern));
        assert!(
            hits.len() <= *budget,
            "`{pattern}` budget exceeded: found {}, max {budget}\n{}",
            hits.len(),
            hits.join("\n")
        );
    }
}

/// `bool::then_some` evaluates its argument even when the bool is false. A
/// guard built that way runs its `Drop` on the rejected path.
#[test]
fn guards_are_built_lazily() {
    let hits = offending_lines(&sources(), |line| {
        line.split_once(".then_some(").is_some_and(|(_, arg)| arg.contains('{') || arg.contains("::new("))
    });
    assert!(hits.is_empty(), "use `.then(|| ...)` for constructed values:\n{}", hits.join("\n"));
}

/// Std mutexes recover from poisoning; tokio mutexes are awaited.
#[test]
fn locks_handle_poisoning() {
    let hits = offending_lines(&sources(), |line| {
        line.contains(".lock()") && !line.contains(".await") && !line.contains("PoisonError::into_inner")
    });
    assert!(hits.is_empty(), "lock without poison recovery:\n{}", hits.join("\n"));
}

#[test]
fn the_scanner_catches_an_eager_guard() {
    let files = vec![(
        PathBuf::from("sample.rs"),
        "ok.then_some(Guard { flag: &f })\nok.then(|| Guard { flag: &f })\nm.lock().unwrap()".to_string(),
    )];
    let eager = offending_lines(&files, |l| l.split_once(".then_some(").is_some_and(|(_, a)| a.contains('{')));
    assert_eq!(eager.len(), 1);
    let unpoisoned =
        offending_lines(&files, |l| l.contains(".lock()") && !l.contains(".await") && !l.contains("PoisonError::into_inner"));
    assert_eq!(unpoisoned.len(), 1);
}
