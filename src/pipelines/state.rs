//! Binding-state tracker for command plans.
//!
//! Replaying a plan through [`BindingState`] catches the mistakes that would
//! otherwise only show up as visual corruption: drawing without a program,
//! binding outside a pass, or ending a pass with state still bound.

use std::collections::BTreeMap;

use crate::pipelines::{Command, Group, Load, Program, Target};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindingError {
    #[error("pass for {0:?} begun while another pass is open")]
    NestedPass(Target),
    #[error("`{0:?}` issued outside a pass")]
    OutsidePass(Command),
    #[error("draw issued with no program bound")]
    DrawWithoutProgram,
    #[error("unbinding slot {0} which holds nothing")]
    UnbindEmpty(u32),
    #[error("program unset while none is bound")]
    UnsetEmpty,
    #[error("pass for {target:?} ended with program {program:?} and groups {groups:?} still bound")]
    Leaked {
        target: Target,
        program: Option<Program>,
        groups: Vec<(u32, Group)>,
    },
    #[error("plan ended with the {0:?} pass still open")]
    Unterminated(Target),
}

/// Binding state plus counters accumulated over a replay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingState {
    pub target: Option<Target>,
    pub program: Option<Program>,
    pub groups: BTreeMap<u32, Group>,
    pub passes: usize,
    /// Targets cleared, in order.
    pub clears: Vec<Target>,
    /// Draws issued, per target.
    pub draws: BTreeMap<Target, usize>,
    /// Target of every pass begun, in order.
    pub sequence: Vec<Target>,
}

impl BindingState {
    /// Replays a whole plan from the neutral state. The plan must finish
    /// neutral too.
    pub fn replay(commands: &[Command]) -> Result<Self, BindingError> {
        let mut state = Self::default();
        for command in commands {
            state.apply(command)?;
        }
        if let Some(target) = state.target {
            return Err(BindingError::Unterminated(target));
        }
        Ok(state)
    }

    /// Nothing bound and no pass open.
    pub fn is_neutral(&self) -> bool {
        self.target.is_none() && self.program.is_none() && self.groups.is_empty()
    }

    pub fn draws_into(&self, target: Target) -> usize {
        self.draws.get(&target).copied().unwrap_or(0)
    }

    pub fn apply(&mut self, command: &Command) -> Result<(), BindingError> {
        match *command {
            Command::BeginPass { target, load } => {
                if self.target.is_some() {
                    return Err(BindingError::NestedPass(target));
                }
                self.target = Some(target);
                self.passes += 1;
                self.sequence.push(target);
                if let Load::Clear(_) = load {
                    self.clears.push(target);
                }
            }
            Command::SetProgram(program) => {
                self.require_pass(command)?;
                self.program = Some(program);
            }
            Command::BindGroup { slot, group } => {
                self.require_pass(command)?;
                self.groups.insert(slot, group);
            }
            Command::UnbindGroup { slot } => {
                self.require_pass(command)?;
                if self.groups.remove(&slot).is_none() {
                    return Err(BindingError::UnbindEmpty(slot));
                }
            }
            Command::Draw(_) => {
                let target = self.require_pass(command)?;
                if self.program.is_none() {
                    return Err(BindingError::DrawWithoutProgram);
                }
                *self.draws.entry(target).or_insert(0) += 1;
            }
            Command::UnsetProgram => {
                self.require_pass(command)?;
                if self.program.take().is_none() {
                    return Err(BindingError::UnsetEmpty);
                }
            }
            Command::EndPass => {
                let target = self.require_pass(command)?;
                if self.program.is_some() || !self.groups.is_empty() {
                    return Err(BindingError::Leaked {
                        target,
                        program: self.program,
                        groups: self.groups.iter().map(|(s, g)| (*s, *g)).collect(),
                    });
                }
                self.target = None;
            }
        }
        Ok(())
    }

    fn require_pass(&self, command: &Command) -> Result<Target, BindingError> {
        self.target.ok_or(BindingError::OutsidePass(*command))
    }
}
