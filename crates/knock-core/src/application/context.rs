use std::sync::Arc;
use tracing::{debug, info};

use crate::application::kernel::Kernel;
use crate::application::rule_registry::RuleRegistry;
use crate::config::KernelConfig;
use crate::CoreError;

/// Scoped embedding of a kernel
///
/// Entering the context builds the kernel. Dropping it tears down every
/// node the kernel still hosts.
pub struct ExecutionContext {
    kernel: Arc<Kernel>,
}

impl ExecutionContext {
    /// Build a kernel and enter its context
    pub fn enter(registry: RuleRegistry, config: KernelConfig) -> Result<Self, CoreError> {
        let kernel = Kernel::new(registry, config)?;
        Ok(Self::with_kernel(kernel))
    }

    /// Enter the context of an already built kernel
    pub fn with_kernel(kernel: Kernel) -> Self {
        debug!("Entering execution context");
        Self {
            kernel: Arc::new(kernel),
        }
    }

    /// The kernel's entry capability
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// A shared reference to the kernel, for driving nodes from other threads
    pub fn shared_kernel(&self) -> Arc<Kernel> {
        Arc::clone(&self.kernel)
    }
}

impl Drop for ExecutionContext {
    fn drop(&mut self) {
        let removed = self.kernel.teardown();
        info!(nodes = removed, "Execution context closed");
    }
}
