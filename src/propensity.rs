/// ==============================================================================================
/// ================================== Propensity Registry ========================================
/// ==============================================================================================
//
// The engine never inspects a propensity's internals — it is a capability set of `Nt` pure
// functions of `(u, v, ldata, gdata, t)`. Built-in template models (the SIR demo) and
// caller-supplied rate functions implement the same trait; the registry is fixed once a `Model`
// is constructed.

use crate::gdata::GlobalData;

/// One transition's instantaneous rate, evaluated at the current state.
///
/// Implementations must be side-effect-free and deterministic: calling `eval` twice with the same
/// arguments must return the same value. The engine relies on this to recompute rates lazily from
/// the dependency graph rather than from scratch after every firing.
pub trait Propensity: Send + Sync {
    fn eval(&self, u_col: &[i64], v_col: &[f64], ldata_col: &[f64], gdata: &GlobalData, t: f64) -> f64;
}

/// Wraps a plain closure as a `Propensity`, for template models that would rather not hand-write
/// a struct per transition.
pub struct Closure<F>(pub F)
where
    F: Fn(&[i64], &[f64], &[f64], &GlobalData, f64) -> f64 + Send + Sync;

impl<F> Propensity for Closure<F>
where
    F: Fn(&[i64], &[f64], &[f64], &GlobalData, f64) -> f64 + Send + Sync,
{
    fn eval(&self, u_col: &[i64], v_col: &[f64], ldata_col: &[f64], gdata: &GlobalData, t: f64) -> f64 {
        (self.0)(u_col, v_col, ldata_col, gdata, t)
    }
}

/// The fixed set of `Nt` transition-rate functions shared read-only across every worker.
pub struct Registry {
    transitions: Vec<Box<dyn Propensity>>,
}

impl Registry {
    pub fn new(transitions: Vec<Box<dyn Propensity>>) -> Self {
        Self { transitions }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    #[inline]
    pub fn eval(
        &self,
        j: usize,
        u_col: &[i64],
        v_col: &[f64],
        ldata_col: &[f64],
        gdata: &GlobalData,
        t: f64,
    ) -> f64 {
        self.transitions[j].eval(u_col, v_col, ldata_col, gdata, t)
    }
}
