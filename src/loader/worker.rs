use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use log::{debug, error};

use crate::audio::{Reverb, SampleBuffer, SampleId};

use super::sample_loader;

/// Work that must stay off both the main loop and the audio thread.
#[derive(Clone, Debug, PartialEq)]
pub enum Job {
    DecodeTrack { session: u64, track: usize, path: PathBuf },
    DecodeBank { session: u64, row: usize, col: usize, path: PathBuf },
    GenerateReverb { track: usize, generation: u64, decay_secs: f32, mix: f32 },
}

#[derive(Debug)]
pub enum Decoded {
    Ok { id: SampleId, buffer: Arc<SampleBuffer> },
    Failed(String),
}

#[derive(Debug)]
pub enum JobResult {
    Track { session: u64, track: usize, path: PathBuf, decoded: Decoded },
    Bank { session: u64, row: usize, col: usize, path: PathBuf, decoded: Decoded },
    Reverb { track: usize, generation: u64, reverb: Box<Reverb> },
}

/// Runs one job to completion. Used by the worker thread, and directly by
/// tests that don't want a thread in the way.
pub fn run_job(job: Job, sample_rate: u32) -> JobResult {
    match job {
        Job::DecodeTrack { session, track, path } => {
            let decoded = decode(&path, sample_rate);
            JobResult::Track { session, track, path, decoded }
        }
        Job::DecodeBank { session, row, col, path } => {
            let decoded = decode(&path, sample_rate);
            JobResult::Bank { session, row, col, path, decoded }
        }
        Job::GenerateReverb { track, generation, decay_secs, mix } => {
            let reverb = Box::new(Reverb::generate(decay_secs, mix, sample_rate as f32));
            JobResult::Reverb { track, generation, reverb }
        }
    }
}

fn decode(path: &std::path::Path, sample_rate: u32) -> Decoded {
    match sample_loader::load(path, sample_rate) {
        Ok((id, buffer)) => {
            debug!("decoded {} ({} frames)", path.display(), buffer.len());
            Decoded::Ok { id, buffer: Arc::new(buffer) }
        }
        Err(e) => {
            error!("failed to decode {}: {:#}", path.display(), e);
            Decoded::Failed(format!("{e:#}"))
        }
    }
}

pub struct Worker {
    jobs: Sender<Job>,
    results: Receiver<JobResult>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Worker {
    pub fn spawn(sample_rate: u32) -> anyhow::Result<Self> {
        let (jobs, job_rx) = crossbeam_channel::unbounded::<Job>();
        let (result_tx, results) = crossbeam_channel::unbounded::<JobResult>();

        let handle = thread::Builder::new()
            .name("loader".into())
            .spawn(move || {
                // ends once every job sender is gone
                for job in job_rx {
                    if result_tx.send(run_job(job, sample_rate)).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self { jobs, results, handle: Some(handle) })
    }

    pub fn submit(&self, job: Job) {
        if let Err(e) = self.jobs.send(job) {
            error!("loader thread is gone, job dropped: {:?}", e.into_inner());
        }
    }

    /// Everything finished since the last poll, without blocking.
    pub fn poll(&self) -> Vec<JobResult> {
        let mut done = vec![];
        loop {
            match self.results.try_recv() {
                Ok(result) => done.push(result),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        done
    }

    /// Blocks for the next result. Tests use this to wait on a job.
    pub fn wait(&self) -> Option<JobResult> {
        self.results.recv().ok()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // swap the sender out so the thread's receive loop ends
        let (dead, _) = crossbeam_channel::unbounded();
        drop(std::mem::replace(&mut self.jobs, dead));
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &std::path::Path) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..100 {
            writer.write_sample((i * 100) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn worker_decodes_track_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kick.wav");
        write_wav(&path);

        let worker = Worker::spawn(44_100).unwrap();
        worker.submit(Job::DecodeTrack { session: 0, track: 3, path: path.clone() });
        match worker.wait() {
            Some(JobResult::Track { track, decoded: Decoded::Ok { buffer, .. }, .. }) => {
                assert_eq!(track, 3);
                assert_eq!(buffer.len(), 100);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn unreadable_files_report_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.wav");
        std::fs::write(&path, b"not a wav").unwrap();

        let result = run_job(Job::DecodeBank { session: 2, row: 1, col: 2, path }, 44_100);
        assert!(matches!(result, JobResult::Bank { session: 2, row: 1, col: 2, decoded: Decoded::Failed(_), .. }));
    }

    #[test]
    fn reverb_jobs_carry_their_generation() {
        let result = run_job(Job::GenerateReverb { track: 0, generation: 7, decay_secs: 2.0, mix: 0.3 }, 44_100);
        match result {
            JobResult::Reverb { generation, reverb, .. } => {
                assert_eq!(generation, 7);
                assert!((reverb.decay_secs() - 2.0).abs() < 1e-6);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
