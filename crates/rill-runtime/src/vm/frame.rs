//! Call frame management

/// A function invocation record.
///
/// Stack layout during a call:
///
/// ```text
/// [caller temporaries] [arg0 arg1 ...] [remaining local slots] [temporaries]
///                       ^ base
/// ```
///
/// The arguments pushed by the caller become the callee's first local slots;
/// the rest of the frame's slots are reserved empty on entry. `RETURN`
/// truncates the stack back to `base` and pushes the return value.
#[derive(Debug, Clone, PartialEq)]
pub struct CallFrame {
    /// Function name, for fault messages
    pub function_name: String,
    /// Where execution resumes after `RETURN`
    pub return_pc: usize,
    /// Absolute stack index of local slot 0
    pub base: usize,
}

impl CallFrame {
    pub fn global() -> Self {
        Self {
            function_name: "<main>".to_string(),
            return_pc: 0,
            base: 0,
        }
    }
}
