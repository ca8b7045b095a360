//! Scope table: the resolution context behind lexical addressing
//!
//! Bindings live in one growable vector; a binding's index is its storage
//! slot. Scope markers record where each block began so exiting a block
//! truncates its bindings and frees their slots for reuse. The frame marker
//! records where the current function's locals begin: slots at or above it
//! are frame-relative locals, everything else is an absolute global.

use crate::ast::NodeId;

/// A lexical address: storage slot offset plus locality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRef {
    /// Frame-relative offset for locals, absolute offset for globals
    pub offset: usize,
    /// True when the offset is relative to the current frame's base pointer
    pub is_local: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Variable,
    Function,
}

#[derive(Debug, Clone)]
struct Binding {
    name: String,
    /// NodeId of the declaring identifier
    decl: NodeId,
    kind: BindingKind,
}

/// Saved bookkeeping returned by [`ScopeTable::enter_function`]
#[derive(Debug, Clone, Copy)]
pub struct FrameCheckpoint {
    saved_watermark: usize,
}

pub struct ScopeTable {
    bindings: Vec<Binding>,
    /// Start index of each open scope; the last entry bounds the innermost
    /// scope's duplicate search
    scopes: Vec<usize>,
    /// Slot where the current function's locals begin; 0 means the global
    /// frame
    frame: usize,
    /// High-water mark of slots used within the current frame
    watermark: usize,
}

impl ScopeTable {
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
            scopes: vec![0],
            frame: 0,
            watermark: 0,
        }
    }

    /// Declare a name in the innermost scope.
    ///
    /// Fails when the name already exists in the innermost scope; shadowing
    /// an enclosing scope's binding is allowed.
    pub fn declare(
        &mut self,
        name: &str,
        decl: NodeId,
        kind: BindingKind,
    ) -> Result<SlotRef, NodeId> {
        let scope_start = *self.scopes.last().unwrap_or(&0);
        if let Some(existing) = self.bindings[scope_start..]
            .iter()
            .rev()
            .find(|b| b.name == name)
        {
            return Err(existing.decl);
        }
        let slot = self.bindings.len();
        self.bindings.push(Binding {
            name: name.to_string(),
            decl,
            kind,
        });
        if self.bindings.len() > self.watermark {
            self.watermark = self.bindings.len();
        }
        Ok(self.address_of(slot))
    }

    /// Resolve a name, searching innermost to outermost down to the globals
    pub fn resolve(&self, name: &str) -> Option<(SlotRef, NodeId, BindingKind)> {
        self.bindings
            .iter()
            .enumerate()
            .rev()
            .find(|(_, b)| b.name == name)
            .map(|(slot, b)| (self.address_of(slot), b.decl, b.kind))
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(self.bindings.len());
    }

    /// Discard all bindings declared since the matching `enter_scope`,
    /// making their slots reusable
    pub fn exit_scope(&mut self) {
        if let Some(marker) = self.scopes.pop() {
            self.bindings.truncate(marker);
        }
    }

    /// Begin a function frame: locals declared from here on are addressed
    /// relative to the new frame
    pub fn enter_function(&mut self) -> FrameCheckpoint {
        let checkpoint = FrameCheckpoint {
            saved_watermark: self.watermark,
        };
        self.frame = self.bindings.len();
        self.watermark = self.frame;
        self.enter_scope();
        checkpoint
    }

    /// End a function frame, restoring the global frame. Returns the number
    /// of local slots the function needs (parameters included).
    pub fn exit_function(&mut self, checkpoint: FrameCheckpoint) -> usize {
        let local_slots = self.watermark - self.frame;
        self.exit_scope();
        self.frame = 0;
        self.watermark = checkpoint.saved_watermark;
        local_slots
    }

    /// High-water mark of global slots seen so far
    pub fn global_watermark(&self) -> usize {
        self.watermark
    }

    fn address_of(&self, slot: usize) -> SlotRef {
        if self.frame > 0 && slot >= self.frame {
            SlotRef {
                offset: slot - self.frame,
                is_local: true,
            }
        } else {
            SlotRef {
                offset: slot,
                is_local: false,
            }
        }
    }
}

impl Default for ScopeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn var(table: &mut ScopeTable, name: &str, decl: NodeId) -> SlotRef {
        table
            .declare(name, decl, BindingKind::Variable)
            .expect("declare should succeed")
    }

    #[test]
    fn globals_get_absolute_offsets() {
        let mut table = ScopeTable::new();
        assert_eq!(
            var(&mut table, "a", 0),
            SlotRef {
                offset: 0,
                is_local: false
            }
        );
        assert_eq!(
            var(&mut table, "b", 1),
            SlotRef {
                offset: 1,
                is_local: false
            }
        );
    }

    #[test]
    fn duplicate_in_same_scope_fails() {
        let mut table = ScopeTable::new();
        var(&mut table, "x", 0);
        assert_eq!(table.declare("x", 1, BindingKind::Variable), Err(0));
    }

    #[test]
    fn shadowing_in_nested_scope_succeeds_and_unwinds() {
        let mut table = ScopeTable::new();
        var(&mut table, "x", 0);
        table.enter_scope();
        let inner = var(&mut table, "x", 1);
        assert_eq!(inner.offset, 1);
        let (resolved, decl, _) = table.resolve("x").expect("resolves to inner");
        assert_eq!(resolved.offset, 1);
        assert_eq!(decl, 1);
        table.exit_scope();
        let (resolved, decl, _) = table.resolve("x").expect("resolves to outer again");
        assert_eq!(resolved.offset, 0);
        assert_eq!(decl, 0);
    }

    #[test]
    fn slots_are_reused_after_scope_exit() {
        let mut table = ScopeTable::new();
        var(&mut table, "a", 0);
        table.enter_scope();
        assert_eq!(var(&mut table, "b", 1).offset, 1);
        table.exit_scope();
        table.enter_scope();
        assert_eq!(var(&mut table, "c", 2).offset, 1);
        table.exit_scope();
    }

    #[test]
    fn function_locals_are_frame_relative() {
        let mut table = ScopeTable::new();
        var(&mut table, "g", 0);
        let checkpoint = table.enter_function();
        let p0 = var(&mut table, "a", 1);
        let p1 = var(&mut table, "b", 2);
        assert_eq!(
            p0,
            SlotRef {
                offset: 0,
                is_local: true
            }
        );
        assert_eq!(
            p1,
            SlotRef {
                offset: 1,
                is_local: true
            }
        );
        // Globals stay absolute while inside the frame
        let (g, _, _) = table.resolve("g").expect("global visible");
        assert_eq!(
            g,
            SlotRef {
                offset: 0,
                is_local: false
            }
        );
        assert_eq!(table.exit_function(checkpoint), 2);
    }

    #[test]
    fn local_slot_count_tracks_block_high_water() {
        let mut table = ScopeTable::new();
        let checkpoint = table.enter_function();
        var(&mut table, "a", 0);
        table.enter_scope();
        var(&mut table, "b", 1);
        var(&mut table, "c", 2);
        table.exit_scope();
        table.enter_scope();
        var(&mut table, "d", 3);
        table.exit_scope();
        // b/c and d reuse the same slots; high water is 3
        assert_eq!(table.exit_function(checkpoint), 3);
    }

    #[test]
    fn global_watermark_survives_functions() {
        let mut table = ScopeTable::new();
        var(&mut table, "g", 0);
        let checkpoint = table.enter_function();
        var(&mut table, "a", 1);
        var(&mut table, "b", 2);
        var(&mut table, "c", 3);
        table.exit_function(checkpoint);
        assert_eq!(table.global_watermark(), 1);
    }

    #[test]
    fn duplicate_check_is_limited_to_innermost_scope() {
        let mut table = ScopeTable::new();
        var(&mut table, "x", 0);
        let checkpoint = table.enter_function();
        // Same name as a global: allowed, it's a new frame scope
        assert!(table.declare("x", 1, BindingKind::Variable).is_ok());
        table.exit_function(checkpoint);
    }
}
