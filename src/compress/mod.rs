//! # Parallel compressor
//!
//! Compresses every file destined to become a `Content` record across a
//! pool of worker threads (§4.5), the same `crossbeam-channel` work-queue
//! shape the reference archiver's `workers` module uses for its bundle
//! pipeline, adapted here to per-file granularity since this format has no
//! bundles. `.br` files are detected in the worker and passed through
//! unchanged instead of being compressed a second time.

use crate::brotli_codec;
use crate::ArchiverError;
use crossbeam_channel::{bounded, unbounded};
use std::path::PathBuf;
use std::thread;

/// One file queued for compression: its archive key and the absolute path
/// to read bytes from.
#[derive(Debug, Clone)]
pub struct CompressionJob {
    pub folder: String,
    pub filename: String,
    pub abs_path: PathBuf,
}

/// The result of compressing (or passing through) one file.
#[derive(Debug, Clone)]
pub struct CompressedFile {
    pub folder: String,
    pub filename: String,
    pub payload: Vec<u8>,
    pub precompressed: bool,
}

fn is_precompressed(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(".br")
}

fn compress_one(job: &CompressionJob) -> Result<CompressedFile, ArchiverError> {
    let data = std::fs::read(&job.abs_path).map_err(|e| ArchiverError::io(e, &job.abs_path))?;
    if is_precompressed(&job.filename) {
        Ok(CompressedFile {
            folder: job.folder.clone(),
            filename: job.filename.clone(),
            payload: data,
            precompressed: true,
        })
    } else {
        let payload = brotli_codec::compress(&data)?;
        Ok(CompressedFile {
            folder: job.folder.clone(),
            filename: job.filename.clone(),
            payload,
            precompressed: false,
        })
    }
}

/// Runs `jobs` through a pool of `worker_count` threads (0 = CPU count) and
/// returns their results. Order of the returned vector matches the order of
/// `jobs`, not completion order -- the writer's traversal decides output
/// order, not the pool.
pub fn compress_all(jobs: Vec<CompressionJob>, worker_count: usize) -> Result<Vec<CompressedFile>, ArchiverError> {
    if jobs.is_empty() {
        return Ok(Vec::new());
    }
    let worker_count = if worker_count == 0 { num_cpus::get() } else { worker_count }.max(1);
    let total = jobs.len();

    let (job_tx, job_rx) = bounded::<(usize, CompressionJob)>(total.min(256).max(1));
    // Unbounded: results aren't drained until after `thread::scope` joins below,
    // so a bounded channel would fill up and deadlock every worker on any pack
    // large enough to exceed its capacity.
    let (result_tx, result_rx) = unbounded::<(usize, Result<CompressedFile, ArchiverError>)>();

    thread::scope(|s| {
        for _ in 0..worker_count {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            s.spawn(move || {
                for (idx, job) in job_rx {
                    let result = compress_one(&job);
                    if result_tx.send((idx, result)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(job_rx);
        drop(result_tx);

        s.spawn(move || {
            for (idx, job) in jobs.into_iter().enumerate() {
                if job_tx.send((idx, job)).is_err() {
                    break;
                }
            }
        });
    });

    let mut results: Vec<Option<Result<CompressedFile, ArchiverError>>> = (0..total).map(|_| None).collect();
    for (idx, result) in result_rx {
        results[idx] = Some(result);
    }

    let mut out = Vec::with_capacity(total);
    for slot in results {
        match slot {
            Some(Ok(file)) => out.push(file),
            Some(Err(e)) => return Err(e),
            None => return Err(ArchiverError::Other("compression worker pool dropped a job".into())),
        }
    }
    Ok(out)
}
