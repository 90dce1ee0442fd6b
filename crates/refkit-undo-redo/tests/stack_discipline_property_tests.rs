//! Property-based tests for undo/redo stack discipline
//!
//! For any sequence of history operations, the stack sizes follow the LIFO
//! model: recording clears redo, undo moves one entry to redo, redo moves one
//! back, and flush empties both.

use proptest::prelude::*;
use refkit_core::{MemoryWorkspace, NullChange, ProgressMonitor, Workspace};
use refkit_undo_redo::{HistoryConfig, UndoManager, UndoRedoError};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Op {
    Add(String),
    Undo,
    Redo,
    Flush,
    ExternalEdit,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => "[a-z]{1,6}".prop_map(Op::Add),
        2 => Just(Op::Undo),
        2 => Just(Op::Redo),
        1 => Just(Op::Flush),
        1 => Just(Op::ExternalEdit),
    ]
}

proptest! {
    #[test]
    fn prop_stacks_follow_lifo_model(
        ops in prop::collection::vec(arb_op(), 0..40),
        limit in 0usize..6,
    ) {
        let ws = Arc::new(MemoryWorkspace::with_files([("f.txt", "x")]));
        let manager = UndoManager::with_config(ws.clone(), &HistoryConfig { undo_limit: limit });
        let monitor = ProgressMonitor::new();
        let mut undo: Vec<String> = Vec::new();
        let mut redo: Vec<String> = Vec::new();

        for op in ops {
            match op {
                Op::Add(name) => {
                    manager.add_undo(name.clone(), Box::new(NullChange::new(name.clone())));
                    redo.clear();
                    undo.push(name);
                    if limit > 0 && undo.len() > limit {
                        undo.remove(0);
                    }
                }
                Op::Undo => match undo.pop() {
                    Some(name) => {
                        manager.perform_undo(&monitor).unwrap();
                        redo.push(name);
                    }
                    None => prop_assert!(matches!(
                        manager.perform_undo(&monitor),
                        Err(UndoRedoError::NoMoreUndos)
                    )),
                },
                Op::Redo => match redo.pop() {
                    Some(name) => {
                        manager.perform_redo(&monitor).unwrap();
                        undo.push(name);
                        if limit > 0 && undo.len() > limit {
                            undo.remove(0);
                        }
                    }
                    None => prop_assert!(matches!(
                        manager.perform_redo(&monitor),
                        Err(UndoRedoError::NoMoreRedos)
                    )),
                },
                Op::Flush => {
                    manager.flush();
                    undo.clear();
                    redo.clear();
                }
                Op::ExternalEdit => {
                    ws.write(Path::new("f.txt"), "changed").unwrap();
                    undo.clear();
                    redo.clear();
                }
            }
            prop_assert_eq!(manager.undo_count(), undo.len());
            prop_assert_eq!(manager.redo_count(), redo.len());
            prop_assert_eq!(manager.peek_undo_name(), undo.last().cloned());
            prop_assert_eq!(manager.peek_redo_name(), redo.last().cloned());
        }
    }
}
