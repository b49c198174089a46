/// Observer of a traced forward run, registered on a tape for the duration
/// of one extraction. The tape invokes it; the observer never calls back
/// into the tape.
pub trait TraceObserver {
    /// About to execute an operation with the given label. The returned
    /// string, if any, becomes the recorded node's name.
    fn on_operation_start(&mut self, label: &str) -> Option<String>;

    /// Entering a sub-module. `None` means the module is anonymous and the
    /// observer should fall back to a placeholder name.
    fn on_scope_enter(&mut self, name: Option<&str>);

    /// Leaving the sub-module entered last.
    fn on_scope_exit(&mut self);
}
