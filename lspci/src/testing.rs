use std::{
    cell::RefCell,
    ffi::{OsStr, OsString},
    rc::Rc,
};

use crate::{Executor, Result};

type Call = (OsString, Vec<OsString>);

/// Records every call and answers with a canned output. Clones share the
/// recorded calls.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeExecutor {
    output: String,
    calls: Rc<RefCell<Vec<Call>>>,
}

impl FakeExecutor {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            calls: Rc::default(),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Arguments of the only call made, as strings
    pub fn single_call_args(&self) -> Vec<String> {
        let calls = self.calls.borrow();
        assert_eq!(calls.len(), 1, "expected exactly one call: {calls:?}");
        calls[0]
            .1
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }
}

impl Executor for FakeExecutor {
    fn execute(&self, program: &OsStr, args: &[OsString]) -> Result<String> {
        self.calls
            .borrow_mut()
            .push((program.to_owned(), args.to_vec()));
        Ok(self.output.clone())
    }
}
