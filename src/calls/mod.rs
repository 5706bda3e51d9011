//! Call-site tables
//!
//! Library wrappers are data: each `CallSite` names a foreign function and
//! its parameters in order. The typed functions in the submodules bind host
//! arguments to a site and pick the result conversion; nothing else varies
//! between wrappers.

pub mod random;
pub mod rational;

use crate::marshal::{Arg, CallSpec};

/// A foreign function and its positional parameter names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallSite {
    pub path: &'static str,
    pub params: &'static [&'static str],
}

impl CallSite {
    pub const fn new(path: &'static str, params: &'static [&'static str]) -> Self {
        Self { path, params }
    }

    /// Whether the site takes `*args`.
    pub fn is_variadic(&self) -> bool {
        self.params.first().is_some_and(|p| p.starts_with('*'))
    }

    /// Bind arguments positionally. `Arg::Omitted` keeps a slot open without
    /// supplying it.
    pub fn spec<const N: usize>(&self, args: [Arg; N]) -> CallSpec {
        debug_assert!(
            self.is_variadic() || N <= self.params.len(),
            "{} takes at most {} arguments",
            self.path,
            self.params.len()
        );
        args.into_iter()
            .fold(CallSpec::new(self.path), |spec, arg| spec.push(arg))
    }

    /// Bind variadic arguments.
    pub fn spec_from(&self, args: impl IntoIterator<Item = Arg>) -> CallSpec {
        args.into_iter()
            .fold(CallSpec::new(self.path), |spec, arg| spec.push(arg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::HostValue;

    #[test]
    fn test_spec_keeps_omitted_slots() {
        let spec = random::RANDINT.spec([Arg::of(3i64), Arg::Omitted, Arg::of(vec![2i64])]);
        assert_eq!(spec.path, "random.randint");
        assert_eq!(
            spec.args,
            vec![
                Arg::Provided(HostValue::Int(3)),
                Arg::Omitted,
                Arg::Provided(HostValue::Ints(vec![2])),
            ]
        );
    }

    #[test]
    fn test_variadic_sites() {
        assert!(random::RAND.is_variadic());
        assert!(!random::RANDINT.is_variadic());
        let spec = random::RAND.spec_from([2i64, 3].map(Arg::of));
        assert_eq!(spec.args.len(), 2);
    }
}
