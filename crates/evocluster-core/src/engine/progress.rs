#[derive(Debug, Clone)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    TaskStart { total_steps: u64 },
    TaskIncrement,
    TaskFinish,

    /// The pool accepted a geometry better than every earlier member.
    NewBest { id: u64, fitness: f64 },

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn reporter_without_callback_ignores_events() {
        ProgressReporter::new().report(Progress::TaskIncrement);
    }

    #[test]
    fn reporter_forwards_events_in_order() {
        let seen = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            let tag = match event {
                Progress::PhaseStart { name } => name.to_string(),
                Progress::NewBest { id, .. } => format!("best-{id}"),
                _ => "other".to_string(),
            };
            seen.lock().unwrap().push(tag);
        }));
        reporter.report(Progress::PhaseStart { name: "Initialization" });
        reporter.report(Progress::NewBest { id: 4, fitness: -1.0 });
        reporter.report(Progress::PhaseFinish);
        drop(reporter);
        assert_eq!(
            seen.into_inner().unwrap(),
            vec!["Initialization", "best-4", "other"]
        );
    }
}
