//! Static enforcement of the lock-discipline invariant (spec section 5
//! "Lock discipline", section 8 mutex-discipline property): `self.inner`'s
//! guard must never be held across an `.await`. Expressed as a source-level
//! check rather than a runtime one, since the property is about what code
//! *could* deadlock under contention, not what a given test run observes.
//!
//! The check: every `{ ... }` block containing `self.inner.lock().await`
//! must not contain a second `.await` after the lock line and before the
//! block's closing brace. We approximate "block" with brace-depth tracking
//! from the lock line to its enclosing close, which is sufficient given the
//! narrow `{ let mut inner = self.inner.lock().await; ...; }` style used
//! throughout this crate.

use std::fs;
use std::path::Path;

const CHECKED_FILES: &[&str] = &["src/app.rs", "src/sync.rs", "src/backfill.rs"];

fn assert_no_await_while_inner_locked(path: &Path) {
    let src = fs::read_to_string(path).unwrap_or_else(|e| panic!("read {path:?}: {e}"));

    for (line_no, line) in src.lines().enumerate() {
        if !line.contains("inner.lock().await") {
            continue;
        }

        // Walk forward from this line, tracking brace depth starting at the
        // depth this line opens/contributes. The lock line itself is almost
        // always inside a `{ ... }` scope whose closing brace ends the
        // critical section; flag any `.await` between here and that close
        // (excluding the lock line's own `.await`).
        let mut depth: i64 = 0;
        for ch in line.chars() {
            match ch {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
        }

        for (offset, later_line) in src.lines().enumerate().skip(line_no + 1) {
            if later_line.contains(".await") {
                panic!(
                    "{}:{}: `.await` found while `inner` mutex guard from line {} may still be held: {:?}",
                    path.display(),
                    line_no + offset + 2,
                    line_no + 1,
                    later_line.trim()
                );
            }
            for ch in later_line.chars() {
                match ch {
                    '{' => depth += 1,
                    '}' => depth -= 1,
                    _ => {}
                }
            }
            if depth <= 0 {
                break;
            }
        }
    }
}

#[test]
fn inner_mutex_guard_never_spans_an_await() {
    let crate_root = Path::new(env!("CARGO_MANIFEST_DIR"));
    for rel in CHECKED_FILES {
        assert_no_await_while_inner_locked(&crate_root.join(rel));
    }
}
