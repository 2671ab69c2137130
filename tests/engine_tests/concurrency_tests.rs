//! Concurrency tests for Engine
//!
//! These tests verify:
//! - Concurrent sessions never corrupt each other's commands
//! - Single-chunk commands through the shared write path stay intact
//! - Concurrent reads never return bytes from two entries
//! - Counters stay consistent under contention

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use cmdlog::Engine;

// =============================================================================
// Helper Functions
// =============================================================================

fn read_all(engine: &Engine) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let chunk = engine.read(out.len(), usize::MAX).unwrap();
        if chunk.is_empty() {
            return out;
        }
        out.extend_from_slice(&chunk);
    }
}

fn command(writer: usize, seq: usize) -> String {
    format!("writer-{}-command-{}-payload\n", writer, seq)
}

/// Split the retained stream into lines, checking each one is a whole command
fn assert_all_commands_intact(stream: &[u8]) -> usize {
    assert!(stream.is_empty() || stream.ends_with(b"\n"));

    let mut count = 0;
    for line in stream.split(|&b| b == b'\n').filter(|l| !l.is_empty()) {
        let line = std::str::from_utf8(line).unwrap();
        let parts: Vec<&str> = line.split('-').collect();
        assert_eq!(parts.len(), 5, "corrupted command: {:?}", line);
        assert_eq!(parts[0], "writer");
        assert_eq!(parts[2], "command");
        assert_eq!(parts[4], "payload");
        count += 1;
    }
    count
}

// =============================================================================
// Writer Tests
// =============================================================================

#[test]
fn test_concurrent_sessions_fragmented_writes() {
    const WRITERS: usize = 8;
    const COMMANDS: usize = 50;
    const CAPACITY: usize = 16;

    let engine = Arc::new(Engine::with_capacity(CAPACITY).unwrap());

    let handles: Vec<_> = (0..WRITERS)
        .map(|w| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let mut session = engine.session();
                for i in 0..COMMANDS {
                    let cmd = command(w, i);
                    let bytes = cmd.as_bytes();
                    let third = bytes.len() / 3;

                    // Three fragments per command, yielding in between
                    session.write(&bytes[..third]).unwrap();
                    thread::yield_now();
                    session.write(&bytes[third..2 * third]).unwrap();
                    thread::yield_now();
                    session.write(&bytes[2 * third..]).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let stats = engine.stats();
    assert_eq!(stats.commands_committed, (WRITERS * COMMANDS) as u64);
    assert_eq!(stats.entries_evicted, (WRITERS * COMMANDS - CAPACITY) as u64);
    assert_eq!(stats.retained_entries, CAPACITY);
    assert_eq!(stats.pending_bytes, 0);

    let stream = read_all(&engine);
    assert_eq!(assert_all_commands_intact(&stream), CAPACITY);
}

#[test]
fn test_concurrent_single_chunk_writes_shared_path() {
    const WRITERS: usize = 6;
    const COMMANDS: usize = 40;

    let engine = Arc::new(Engine::with_capacity(WRITERS * COMMANDS).unwrap());

    let handles: Vec<_> = (0..WRITERS)
        .map(|w| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..COMMANDS {
                    let cmd = command(w, i);
                    assert_eq!(engine.write(cmd.as_bytes()).unwrap(), cmd.len());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // Nothing evicted: every command is still there, whole
    let stream = read_all(&engine);
    assert_eq!(assert_all_commands_intact(&stream), WRITERS * COMMANDS);

    // Per-writer order is preserved
    let text = String::from_utf8(stream).unwrap();
    for w in 0..WRITERS {
        let prefix = format!("writer-{}-", w);
        let seqs: Vec<usize> = text
            .lines()
            .filter(|l| l.starts_with(&prefix))
            .map(|l| l.split('-').nth(3).unwrap().parse().unwrap())
            .collect();
        assert_eq!(seqs, (0..COMMANDS).collect::<Vec<_>>());
    }
}

// =============================================================================
// Reader / Writer Tests
// =============================================================================

#[test]
fn test_reads_never_cross_entries_under_contention() {
    let engine = Arc::new(Engine::with_capacity(8).unwrap());
    let done = Arc::new(AtomicBool::new(false));

    let writers: Vec<_> = (0..3)
        .map(|w| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let mut session = engine.session();
                for i in 0..300 {
                    session.write(command(w, i).as_bytes()).unwrap();
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut reads = 0usize;
                while !done.load(Ordering::SeqCst) {
                    let mut offset = 0;
                    loop {
                        let chunk = engine.read(offset, 64).unwrap();
                        if chunk.is_empty() {
                            break;
                        }
                        // At most one terminator, and only as the last byte
                        let terminators = chunk.iter().filter(|&&b| b == b'\n').count();
                        assert!(terminators <= 1);
                        if terminators == 1 {
                            assert_eq!(chunk.last(), Some(&b'\n'));
                        }
                        offset += chunk.len();
                        reads += 1;
                    }
                }
                reads
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }
    done.store(true, Ordering::SeqCst);
    for reader in readers {
        reader.join().unwrap();
    }

    let stream = read_all(&engine);
    assert_eq!(assert_all_commands_intact(&stream), 8);
    assert_eq!(engine.stats().commands_committed, 900);
}
