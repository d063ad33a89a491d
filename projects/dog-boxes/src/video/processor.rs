use crate::error::{JobError, JobResult};
use crate::pipeline::reader::read_worker;
use crate::pipeline::types::RawFrame;
use crate::video::{opencv_reader::OpencvReader, opencv_writer::OpencvWriter};
use indicatif::{ProgressBar, ProgressStyle};
use opencv::core::Mat;
use std::path::Path;
use std::time::{Duration, Instant};

/// Capacity of the decode queue in pipelined mode.
const DECODE_QUEUE_DEPTH: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct ProcessingStats {
    pub processed_frames: usize,
    /// Frames with at least one box drawn
    pub annotated_frames: usize,
    pub boxes_drawn: usize,
    pub duration: Duration,
}

/// A trait for handling video frames. This separates the "how to process"
/// from the "how to read and orchestrate" logic.
///
/// Implementations may draw on the frame in place and return how many
/// annotations they added.
pub trait FrameProcessor {
    fn process(&mut self, frame: &mut Mat) -> JobResult<usize>;
}

/// Blanket implementation so any closure with the right signature
/// automatically implements FrameProcessor.
impl<F> FrameProcessor for F
where
    F: FnMut(&mut Mat) -> JobResult<usize>,
{
    fn process(&mut self, frame: &mut Mat) -> JobResult<usize> {
        self(frame)
    }
}

/// Open handles for one pass over a video.
struct VideoSession {
    reader: Option<OpencvReader>,
    writer: OpencvWriter,
    pb: ProgressBar,
    start_time: Instant,
    stats: ProcessingStats,
}

impl VideoSession {
    fn open(input: &Path, output: &Path) -> JobResult<Self> {
        let reader = OpencvReader::open(input)?;
        let info = reader.info();
        let writer = OpencvWriter::create(output, &info)?;

        let pb = ProgressBar::new(info.frame_count as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec:.1.yellow} fps, {eta})")
                .map_err(|e| JobError::Task(e.to_string()))?
                .progress_chars("#>-"),
        );

        Ok(Self {
            reader: Some(reader),
            writer,
            pb,
            start_time: Instant::now(),
            stats: ProcessingStats::default(),
        })
    }

    fn handle<P: FrameProcessor>(&mut self, mut frame: Mat, processor: &mut P) -> JobResult<()> {
        let drawn = processor.process(&mut frame)?;
        self.writer.write(&frame)?;

        self.stats.processed_frames += 1;
        if drawn > 0 {
            self.stats.annotated_frames += 1;
            self.stats.boxes_drawn += drawn;
        }
        self.pb.inc(1);
        Ok(())
    }

    fn release_reader(&mut self) {
        if let Some(mut reader) = self.reader.take() {
            if let Err(e) = reader.release() {
                tracing::warn!("Failed to release video reader: {}", e);
            }
        }
    }

    /// Releases both handles and deletes the consumed input file.
    fn release(mut self, input: &Path) {
        self.release_reader();
        if let Err(e) = self.writer.release() {
            tracing::warn!("Failed to release video writer: {}", e);
        }
        if !self.pb.is_finished() {
            self.pb.abandon();
        }

        remove_input(input);
    }
}

/// Deletes the consumed input; a file that is already gone is fine.
fn remove_input(input: &Path) {
    match std::fs::remove_file(input) {
        Ok(()) => tracing::debug!("Removed input file {}", input.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove input file {}: {}", input.display(), e),
    }
}

/// Decodes `input`, runs `processor` on every frame in order and encodes the
/// result to `output` with the input's geometry and frame rate.
///
/// Handles are released and `input` is deleted however the loop exits.
/// With `pipelined` set, decoding runs on a separate reader thread feeding a
/// bounded queue; processing and encoding stay on the calling thread.
pub fn process_video<P>(
    input: &Path,
    output: &Path,
    pipelined: bool,
    mut processor: P,
) -> JobResult<ProcessingStats>
where
    P: FrameProcessor,
{
    // Reader handles are dropped on error, so the input can go right away
    let session = VideoSession::open(input, output).inspect_err(|_| remove_input(input))?;
    let mut session = scopeguard::guard(session, |session| session.release(input));

    if pipelined {
        // The worker opens its own capture
        session.release_reader();

        std::thread::scope(|s| -> JobResult<()> {
            let (tx, rx) = crossbeam::channel::bounded::<RawFrame>(DECODE_QUEUE_DEPTH);
            let worker = s.spawn(move || read_worker(tx, input));

            for raw in rx.iter() {
                if raw.id != session.stats.processed_frames {
                    return Err(JobError::Task(format!(
                        "frame {} arrived out of order, expected {}",
                        raw.id, session.stats.processed_frames
                    )));
                }
                session.handle(raw.mat, &mut processor)?;
            }

            let frames_read = worker
                .join()
                .map_err(|_| JobError::Task("reader worker panicked".to_string()))??;
            tracing::debug!("Reader worker finished after {} frames", frames_read);
            Ok(())
        })?;
    } else {
        while let Some(frame) = session.reader.as_mut().and_then(OpencvReader::read_or_end) {
            session.handle(frame, &mut processor)?;
        }
    }

    session.pb.finish_with_message("Done");

    let mut stats = session.stats.clone();
    stats.duration = session.start_time.elapsed();
    Ok(stats)
}
