//! Bounded-memory external merge sort of `(key, value)` pairs
//!
//! Pairs are buffered up to `chunk_edges` at a time. A full buffer is sorted
//! in parallel and spilled to a temporary run file of bincode records. When
//! input ends the runs are merged `fan_in` at a time with a binary heap,
//! level by level, until one merge can produce the final stream.
//!
//! Run files are [`TempPath`]s and disappear once dropped, so every
//! temporary file is gone when the sorted stream is dropped.

use crate::graph::GraphResult;
use rayon::slice::ParallelSliceMut;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempPath};
use tracing::debug;

type Pair = (u32, u32);

/// A sorted run on disk
struct Run {
    path: TempPath,
    count: u64,
}

/// Accumulates pairs and produces them in ascending `(key, value)` order
pub struct ExternalSorter {
    chunk_edges: usize,
    fan_in: usize,
    temp_dir: PathBuf,
    buffer: Vec<Pair>,
    runs: Vec<Run>,
    total: u64,
}

impl ExternalSorter {
    pub fn new(chunk_edges: usize, fan_in: usize, temp_dir: &Path) -> Self {
        let chunk_edges = chunk_edges.max(1);
        Self {
            chunk_edges,
            fan_in: fan_in.max(2),
            temp_dir: temp_dir.to_path_buf(),
            buffer: Vec::with_capacity(chunk_edges.min(1 << 20)),
            runs: Vec::new(),
            total: 0,
        }
    }

    pub fn push(&mut self, key: u32, value: u32) -> GraphResult<()> {
        self.buffer.push((key, value));
        self.total += 1;
        if self.buffer.len() >= self.chunk_edges {
            self.spill()?;
        }
        Ok(())
    }

    /// Pairs pushed so far
    pub fn len(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Number of runs spilled so far
    pub fn runs(&self) -> usize {
        self.runs.len()
    }

    fn spill(&mut self) -> GraphResult<()> {
        self.buffer.par_sort_unstable();
        let file = NamedTempFile::new_in(&self.temp_dir)?;
        let mut writer = BufWriter::new(file);
        for pair in &self.buffer {
            bincode::serialize_into(&mut writer, pair)?;
        }
        writer.flush()?;
        let file = writer.into_inner().map_err(|err| err.into_error())?;

        let count = self.buffer.len() as u64;
        self.runs.push(Run {
            path: file.into_temp_path(),
            count,
        });
        debug!("Spilled sort run {} ({} pairs)", self.runs.len(), count);
        self.buffer.clear();
        Ok(())
    }

    /// Finish input and return the sorted stream
    pub fn finish(mut self) -> GraphResult<SortedPairs> {
        if self.runs.is_empty() {
            self.buffer.par_sort_unstable();
            return Ok(SortedPairs::Memory(std::mem::take(&mut self.buffer).into_iter()));
        }
        if !self.buffer.is_empty() {
            self.spill()?;
        }
        self.buffer = Vec::new();

        let mut runs = std::mem::take(&mut self.runs);
        let mut level = 0;
        while runs.len() > self.fan_in {
            level += 1;
            let mut merged = Vec::with_capacity(runs.len() / self.fan_in + 1);
            let mut pending = runs.into_iter().peekable();
            while pending.peek().is_some() {
                let group: Vec<Run> = pending.by_ref().take(self.fan_in).collect();
                merged.push(self.merge_to_run(group)?);
            }
            debug!("Merge level {} produced {} runs", level, merged.len());
            runs = merged;
        }
        Ok(SortedPairs::Merged(RunMerger::new(runs)?))
    }

    fn merge_to_run(&self, group: Vec<Run>) -> GraphResult<Run> {
        let count = group.iter().map(|run| run.count).sum();
        let file = NamedTempFile::new_in(&self.temp_dir)?;
        let mut writer = BufWriter::new(file);
        for pair in RunMerger::new(group)? {
            bincode::serialize_into(&mut writer, &pair?)?;
        }
        writer.flush()?;
        let file = writer.into_inner().map_err(|err| err.into_error())?;
        Ok(Run {
            path: file.into_temp_path(),
            count,
        })
    }
}

/// Sequential reader over one run
struct RunReader {
    reader: BufReader<File>,
    remaining: u64,
}

impl RunReader {
    fn open(run: &Run) -> GraphResult<Self> {
        Ok(Self {
            reader: BufReader::new(File::open(&run.path)?),
            remaining: run.count,
        })
    }

    fn next_pair(&mut self) -> GraphResult<Option<Pair>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        Ok(Some(bincode::deserialize_from(&mut self.reader)?))
    }
}

/// K-way merge of sorted runs
pub struct RunMerger {
    readers: Vec<RunReader>,
    heap: BinaryHeap<Reverse<(Pair, usize)>>,
    // Dropped with the merger, deleting the run files.
    _runs: Vec<Run>,
    failed: bool,
}

impl RunMerger {
    fn new(runs: Vec<Run>) -> GraphResult<Self> {
        let mut readers = Vec::with_capacity(runs.len());
        let mut heap = BinaryHeap::with_capacity(runs.len());
        for (slot, run) in runs.iter().enumerate() {
            let mut reader = RunReader::open(run)?;
            if let Some(pair) = reader.next_pair()? {
                heap.push(Reverse((pair, slot)));
            }
            readers.push(reader);
        }
        Ok(Self {
            readers,
            heap,
            _runs: runs,
            failed: false,
        })
    }

    fn next_pair(&mut self) -> GraphResult<Option<Pair>> {
        let Reverse((pair, slot)) = match self.heap.pop() {
            Some(entry) => entry,
            None => return Ok(None),
        };
        if let Some(next) = self.readers[slot].next_pair()? {
            self.heap.push(Reverse((next, slot)));
        }
        Ok(Some(pair))
    }
}

impl Iterator for RunMerger {
    type Item = GraphResult<Pair>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_pair() {
            Ok(pair) => pair.map(Ok),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Output of [`ExternalSorter::finish`]
pub enum SortedPairs {
    /// Everything fit in one chunk
    Memory(std::vec::IntoIter<Pair>),
    Merged(RunMerger),
}

impl Iterator for SortedPairs {
    type Item = GraphResult<Pair>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            SortedPairs::Memory(pairs) => pairs.next().map(Ok),
            SortedPairs::Merged(merger) => merger.next(),
        }
    }
}
