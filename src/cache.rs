use std::sync::{Arc, Mutex, MutexGuard};

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::expression::{CompileError, CompiledExpression, ExpressionParser, ParseOptions};

/// Memoizes compiled expressions by their trimmed source text.
///
/// Each distinct text is compiled at most once; failed compilations are not
/// stored, so the next lookup reports the error again. The cache never
/// evicts.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use safe_expression::ExpressionCache;
///
/// let cache = ExpressionCache::new();
/// let first = cache.get("a + b").unwrap();
/// let second = cache.get("  a + b ").unwrap();
/// assert!(Arc::ptr_eq(&first, &second));
/// ```
#[derive(Debug, Default)]
pub struct ExpressionCache {
    parser: ExpressionParser,
    entries: Mutex<FxHashMap<String, Arc<CompiledExpression>>>,
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ParseOptions) -> Self {
        ExpressionCache {
            parser: ExpressionParser::with_options(options),
            entries: Mutex::default(),
        }
    }

    /// The compiled form of `text`, compiling it on first use.
    pub fn get(&self, text: &str) -> Result<Arc<CompiledExpression>, CompileError> {
        let key = text.trim();
        let mut entries = self.lock();
        if let Some(compiled) = entries.get(key) {
            trace!(source = key, "expression cache hit");
            return Ok(Arc::clone(compiled));
        }

        trace!(source = key, "expression cache miss");
        let compiled = Arc::new(self.parser.parse(key)?);
        entries.insert(key.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    // A panic while compiling cannot leave a half-written entry behind.
    fn lock(&self) -> MutexGuard<'_, FxHashMap<String, Arc<CompiledExpression>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
