use std::collections::BTreeMap;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

use crate::error::KernelFault;

pub(crate) type Task = Box<dyn FnOnce() -> Result<(), KernelFault> + Send>;

struct Job {
    id: u64,
    task: Task,
}

/// Submission and completion counters shared with the stream worker.
#[derive(Debug, Default)]
struct Progress {
    /// Id of the last submitted task. Ids start at 1.
    submitted: u64,
    /// Id of the last finished task.
    completed: u64,
    /// Failed tasks by id, kept until cleared.
    failures: BTreeMap<u64, KernelFault>,
    /// The worker has stopped and will finish nothing more.
    terminated: bool,
}

#[derive(Debug, Default)]
struct Tracker {
    progress: Mutex<Progress>,
    finished: Condvar,
}

impl Tracker {
    fn lock(&self) -> MutexGuard<'_, Progress> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-order queue of asynchronous device work.
///
/// A dedicated worker thread runs submitted tasks one at a time in
/// submission order. `submit` returns as soon as the task is queued.
/// Waiting is by sequence number: a caller waits for everything submitted
/// before it started waiting, however many other threads wait at once.
///
/// Failures are sticky. Every later `synchronize` reports the earliest one
/// until `clear_failures`.
pub(crate) struct Stream {
    tx: Mutex<Option<mpsc::Sender<Job>>>,
    handle: Option<thread::JoinHandle<()>>,
    tracker: Arc<Tracker>,
}

impl Stream {
    pub(crate) fn new(device_name: &str) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Job>();
        let tracker = Arc::new(Tracker::default());
        let worker_tracker = Arc::clone(&tracker);
        let thread_name = format!("{device_name}-stream");
        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                log::trace!("{thread_name} started");
                run_jobs(rx, &worker_tracker);
                worker_tracker.lock().terminated = true;
                worker_tracker.finished.notify_all();
                log::trace!("{thread_name} stopped");
            })?;
        Ok(Stream {
            tx: Mutex::new(Some(tx)),
            handle: Some(handle),
            tracker,
        })
    }

    /// Queue `task` and return its id.
    pub(crate) fn submit(&self, task: Task) -> Result<u64, KernelFault> {
        let mut progress = self.tracker.lock();
        if progress.terminated {
            return Err(KernelFault::StreamTerminated);
        }
        let id = progress.submitted + 1;
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        tx.as_ref()
            .ok_or(KernelFault::StreamTerminated)?
            .send(Job { id, task })
            .map_err(|_| KernelFault::StreamTerminated)?;
        progress.submitted = id;
        Ok(id)
    }

    /// Block until every task submitted so far has finished, without
    /// looking at failures.
    pub(crate) fn wait(&self) {
        drop(self.wait_for_submitted());
    }

    /// Wait for all tasks submitted so far and return the earliest failure
    /// among them, if any.
    pub(crate) fn synchronize(&self) -> Result<(), KernelFault> {
        let (progress, target) = self.wait_for_submitted();
        if let Some((_, fault)) = progress.failures.range(..=target).next() {
            return Err(fault.clone());
        }
        if progress.completed < target {
            return Err(KernelFault::StreamTerminated);
        }
        Ok(())
    }

    /// Forget failures of tasks that have already finished.
    pub(crate) fn clear_failures(&self) {
        let mut progress = self.tracker.lock();
        let completed = progress.completed;
        progress.failures.retain(|&id, _| id > completed);
    }

    /// Number of tasks submitted and not yet finished.
    pub(crate) fn queued(&self) -> usize {
        let progress = self.tracker.lock();
        (progress.submitted - progress.completed) as usize
    }

    fn wait_for_submitted(&self) -> (MutexGuard<'_, Progress>, u64) {
        let mut progress = self.tracker.lock();
        let target = progress.submitted;
        while progress.completed < target && !progress.terminated {
            progress = self
                .tracker
                .finished
                .wait(progress)
                .unwrap_or_else(PoisonError::into_inner);
        }
        (progress, target)
    }
}

fn run_jobs(rx: mpsc::Receiver<Job>, tracker: &Tracker) {
    for Job { id, task } in rx.iter() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(task));
        let mut progress = tracker.lock();
        progress.completed = id;
        let stop = match outcome {
            Ok(Ok(())) => false,
            Ok(Err(fault)) => {
                progress.failures.insert(id, fault);
                false
            }
            Err(_) => {
                log::error!("stream task {id} panicked, stream stopped");
                progress.failures.insert(id, KernelFault::StreamTerminated);
                progress.terminated = true;
                true
            }
        };
        drop(progress);
        tracker.finished.notify_all();
        if stop {
            return;
        }
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop once the queue drains.
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_tasks_run_in_order() {
        let stream = Stream::new("test").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..5 {
            let log = Arc::clone(&log);
            let id = stream
                .submit(Box::new(move || {
                    log.lock().unwrap().push(i);
                    Ok(())
                }))
                .unwrap();
            assert_eq!(id, i as u64 + 1);
        }
        assert!(stream.synchronize().is_ok());
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(stream.queued(), 0);
    }

    #[test]
    fn test_failures_are_sticky_until_cleared() {
        let stream = Stream::new("test").unwrap();
        let ran = Arc::new(AtomicUsize::new(0));
        for i in 0..3 {
            let ran = Arc::clone(&ran);
            stream
                .submit(Box::new(move || {
                    ran.fetch_add(1, Ordering::SeqCst);
                    if i == 0 {
                        Ok(())
                    } else {
                        Err(KernelFault::IllegalAddress { index: i, len: 0 })
                    }
                }))
                .unwrap();
        }
        let first = Err(KernelFault::IllegalAddress { index: 1, len: 0 });
        assert_eq!(stream.synchronize(), first);
        // later tasks still ran
        assert_eq!(ran.load(Ordering::SeqCst), 3);
        assert_eq!(stream.synchronize(), first);

        stream.clear_failures();
        assert!(stream.synchronize().is_ok());
    }

    #[test]
    fn test_every_waiter_sees_its_own_work_finished() {
        let stream = Stream::new("test").unwrap();
        let done = Arc::new(AtomicUsize::new(0));
        let slow = Arc::clone(&done);
        stream
            .submit(Box::new(move || {
                thread::sleep(Duration::from_millis(100));
                slow.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();
        let fast = Arc::clone(&done);
        stream
            .submit(Box::new(move || {
                fast.fetch_add(1, Ordering::SeqCst);
                Err(KernelFault::IllegalAddress { index: 7, len: 4 })
            }))
            .unwrap();

        thread::scope(|s| {
            let other = s.spawn(|| stream.synchronize());
            thread::sleep(Duration::from_millis(20));
            let mine = stream.synchronize();
            assert_eq!(done.load(Ordering::SeqCst), 2);
            assert_eq!(mine, other.join().unwrap());
            assert!(mine.is_err());
        });
    }

    #[test]
    fn test_panicking_task_terminates_stream() {
        let stream = Stream::new("test").unwrap();
        stream
            .submit(Box::new(|| -> Result<(), KernelFault> { panic!("boom") }))
            .unwrap();
        assert_eq!(stream.synchronize(), Err(KernelFault::StreamTerminated));
        assert_eq!(
            stream.submit(Box::new(|| Ok(()))),
            Err(KernelFault::StreamTerminated)
        );
    }
}
