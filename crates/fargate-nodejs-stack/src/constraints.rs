//! Checks the provisioning engine would otherwise reject at deploy time.

use crate::StackError;
use crate::resource::Resource;
use crate::resource::logs::ALLOWED_RETENTION_DAYS;

/// Memory sizes (MiB) Fargate accepts for a CPU value.
///
/// Returns `None` for an unsupported CPU value.
pub fn fargate_memory_options(cpu: u32) -> Option<Vec<u32>> {
    let (min, max, step) = match cpu {
        256 => return Some(vec![512, 1024, 2048]),
        512 => (1024, 4096, 1024),
        1024 => (2048, 8192, 1024),
        2048 => (4096, 16384, 1024),
        4096 => (8192, 30720, 1024),
        8192 => (16384, 61440, 4096),
        16384 => (32768, 122880, 8192),
        _ => return None,
    };
    Some((min..=max).step_by(step).collect())
}

/// Whether Fargate can run a task of this size.
pub fn is_valid_fargate_size(cpu: u32, memory_mib: u32) -> bool {
    fargate_memory_options(cpu).is_some_and(|options| options.contains(&memory_mib))
}

/// Validate a resource before it enters the stack.
pub fn validate(resource: &Resource) -> Result<(), StackError> {
    match resource {
        Resource::TaskDefinition(td) => {
            let valid = match (td.cpu.parse::<u32>(), td.memory.parse::<u32>()) {
                (Ok(cpu), Ok(memory)) => is_valid_fargate_size(cpu, memory),
                _ => false,
            };
            if !valid {
                return Err(StackError::InvalidTaskSize {
                    cpu: td.cpu.clone(),
                    memory: td.memory.clone(),
                });
            }
        }
        Resource::ListenerRule(rule) if !(1..=50_000).contains(&rule.priority) => {
            return Err(StackError::InvalidListenerRulePriority(rule.priority));
        }
        Resource::ScalableTarget(target) if target.min_capacity > target.max_capacity => {
            return Err(StackError::InvalidCapacity {
                min: target.min_capacity,
                max: target.max_capacity,
            });
        }
        Resource::LogGroup(group) if !ALLOWED_RETENTION_DAYS.contains(&group.retention_in_days) => {
            return Err(StackError::InvalidLogRetention(group.retention_in_days));
        }
        _ => {}
    }
    Ok(())
}
