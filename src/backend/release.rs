// Scoped release of Vulkan handles
//
// Every successful acquisition pushes its release action here. Actions run
// in strict reverse push order, either when the stack is unwound explicitly
// or when it is dropped, so a failure halfway through initialization still
// releases everything acquired before it.

/// Ordered list of pending release actions
#[derive(Default)]
pub struct ReleaseStack {
    actions: Vec<(&'static str, Box<dyn FnOnce()>)>,
}

impl ReleaseStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the release of a freshly acquired handle. The action runs
    /// after every action pushed later than it.
    pub fn push(&mut self, name: &'static str, release: impl FnOnce() + 'static) {
        log::debug!("Acquired {}", name);
        self.actions.push((name, Box::new(release)));
    }

    /// Names of pending releases, in acquisition order
    pub fn names(&self) -> Vec<&'static str> {
        self.actions.iter().map(|(name, _)| *name).collect()
    }

    /// Run all pending actions, last acquired first
    pub fn unwind(&mut self) {
        while let Some((name, release)) = self.actions.pop() {
            log::debug!("Releasing {}", name);
            release();
        }
    }
}

impl Drop for ReleaseStack {
    fn drop(&mut self) {
        self.unwind();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn FnOnce()>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let make = move |name: &'static str| {
            let sink = sink.clone();
            Box::new(move || sink.borrow_mut().push(name)) as Box<dyn FnOnce()>
        };
        (log, make)
    }

    #[test]
    fn full_run_releases_in_reverse_acquisition_order() {
        let (log, release) = recorder();
        let acquired = ["instance", "debug messenger", "logical device"];

        {
            let mut stack = ReleaseStack::new();
            for name in acquired {
                stack.push(name, release(name));
            }
            assert_eq!(stack.names(), acquired);
            assert!(log.borrow().is_empty());
        }

        let released: Vec<_> = acquired.iter().rev().copied().collect();
        assert_eq!(*log.borrow(), released);
    }

    fn acquire_all(
        release: &impl Fn(&'static str) -> Box<dyn FnOnce()>,
        fail_at: Option<usize>,
    ) -> Result<ReleaseStack, &'static str> {
        let mut stack = ReleaseStack::new();
        for (step, name) in ["instance", "debug messenger", "logical device"]
            .into_iter()
            .enumerate()
        {
            if fail_at == Some(step) {
                return Err("no suitable gpu");
            }
            stack.push(name, release(name));
        }
        Ok(stack)
    }

    #[test]
    fn failure_midway_releases_what_was_acquired() {
        let (log, release) = recorder();

        assert!(acquire_all(&release, Some(2)).is_err());
        assert_eq!(*log.borrow(), vec!["debug messenger", "instance"]);
    }

    #[test]
    fn explicit_unwind_matches_drop_order() {
        let (log, release) = recorder();

        let mut stack = acquire_all(&release, None).unwrap();
        stack.unwind();
        assert_eq!(
            *log.borrow(),
            vec!["logical device", "debug messenger", "instance"]
        );
    }

    #[test]
    fn unwind_is_idempotent() {
        let (log, release) = recorder();
        let mut stack = ReleaseStack::new();
        stack.push("instance", release("instance"));

        stack.unwind();
        assert!(stack.names().is_empty());
        drop(stack);

        assert_eq!(*log.borrow(), vec!["instance"]);
    }
}
