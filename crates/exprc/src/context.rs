//! Runtime values and the three context shapes the generated `eval` method
//! can be invoked against (`ContextKind::{Map,List,Pojo}`,
//! mirrored here without a real JVM underneath it — see DESIGN.md's "host
//! language boundary" decision).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::EvaluationError;

/// A reflectively-accessible POJO-equivalent: the facade has no real
/// objects to reflect over, so a caller supplying `EvalContext::Pojo`
/// implements this trait to answer getter lookups by name (the same name
/// `exprc_emit`'s `getter_name()` would have resolved against a real class:
/// field `age` is asked for as `"getAge"`).
pub trait PojoContext: Send + Sync + fmt::Debug {
    /// Resolve the value a generated getter call named `getter` would have
    /// returned, or `None` if this pojo has no such property.
    fn get_field(&self, getter: &str) -> Option<RtValue>;
}

/// What a generated evaluator is invoked against.
#[derive(Clone, Debug)]
pub enum EvalContext {
    /// A `java.util.Map`-shaped context: string keys, arbitrary values.
    Map(BTreeMap<String, RtValue>),
    /// A `java.util.List`-shaped context: positional values.
    List(Vec<RtValue>),
    /// A reflective POJO-equivalent context.
    Pojo(Arc<dyn PojoContext>),
}

impl EvalContext {
    pub(crate) fn into_rt_value(self) -> RtValue {
        let obj = match self {
            EvalContext::Map(m) => RtObject::Map(m),
            EvalContext::List(l) => RtObject::List(l),
            EvalContext::Pojo(p) => RtObject::Pojo(p),
        };
        RtValue::Object(Arc::new(Mutex::new(obj)))
    }
}

/// A runtime value flowing through the bytecode interpreter's stack and
/// locals. Boxing/unboxing (the emitter's `box_primitive`/`unbox_reference`)
/// collapses to the identity function here: a boxed `Integer` and a raw
/// `int` are the same Rust value, since nothing downstream of this crate
/// ever needs to distinguish them without a real JVM object header.
#[derive(Clone, Debug)]
pub enum RtValue {
    /// `int`, plus the sub-int primitives (`short`, `byte`, `char`,
    /// `boolean`) widened to `int` at the declaration site the way the
    /// emitter's own widening lattice already treats them.
    Int(i32),
    /// `long`.
    Long(i64),
    /// `float`.
    Float(f32),
    /// `double`.
    Double(f64),
    /// `boolean`, kept distinct from `Int` so `Evaluator<bool>` round-trips
    /// without a truthiness guess.
    Boolean(bool),
    /// `char`, a UTF-16 code unit.
    Char(u16),
    /// `null`.
    Null,
    /// Any reference type: string, boxed big-number, collection, or a
    /// user-supplied [`PojoContext`] handle.
    Object(Arc<Mutex<RtObject>>),
}

/// The reference-type payload behind [`RtValue::Object`]. `Uninit` is the
/// momentary state between a `new` and the matching `invokespecial <init>`
/// — see `interp.rs`'s constructor handling.
#[derive(Debug)]
pub enum RtObject {
    /// Freshly `new`'d, not yet initialized by `<init>`.
    Uninit(String),
    /// `java.lang.String`.
    Str(String),
    /// `java.util.Map` (produced by context injection or `Map.of`/`Map.ofEntries`).
    Map(BTreeMap<String, RtValue>),
    /// `java.util.List` (produced by context injection or `List.of`).
    List(Vec<RtValue>),
    /// `java.math.BigDecimal`, kept as its canonical decimal text — this
    /// core never emits arithmetic over big-number types directly —
    /// compound assignment on one is a permanent fallback category — so
    /// only construction and stringification need to be faithful.
    BigDecimal(String),
    /// `java.math.BigInteger`. `i128` comfortably covers every literal this
    /// DSL can produce (`0I`-suffixed integer text), though it is not
    /// arbitrary-precision the way `java.math.BigInteger` is.
    BigInteger(i128),
    /// `java.time.Duration`, stored as total nanoseconds.
    Duration(i64),
    /// `java.lang.StringBuilder`'s mutable buffer.
    StringBuilder(String),
    /// A reflective POJO-equivalent handle.
    Pojo(Arc<dyn PojoContext>),
}

impl RtValue {
    /// Render this value the way `Object.toString()` would, for string
    /// concatenation (`StringBuilder.append(Object)`) and `Evaluator<String>`.
    pub fn java_to_string(&self) -> String {
        match self {
            RtValue::Int(v) => v.to_string(),
            RtValue::Long(v) => v.to_string(),
            RtValue::Float(v) => v.to_string(),
            RtValue::Double(v) => v.to_string(),
            RtValue::Boolean(v) => v.to_string(),
            RtValue::Char(v) => char::from_u32(*v as u32).unwrap_or('\u{FFFD}').to_string(),
            RtValue::Null => "null".to_string(),
            RtValue::Object(obj) => match &*obj.lock().expect("rtvalue mutex poisoned") {
                RtObject::Uninit(class) => format!("<uninitialized {class}>"),
                RtObject::Str(s) => s.clone(),
                RtObject::Map(m) => {
                    let mut parts: Vec<String> =
                        m.iter().map(|(k, v)| format!("{k}={}", v.java_to_string())).collect();
                    parts.sort();
                    format!("{{{}}}", parts.join(", "))
                }
                RtObject::List(items) => {
                    let parts: Vec<String> = items.iter().map(|v| v.java_to_string()).collect();
                    format!("[{}]", parts.join(", "))
                }
                RtObject::BigDecimal(text) => text.clone(),
                RtObject::BigInteger(v) => v.to_string(),
                RtObject::Duration(nanos) => format!("PT{:.9}S", *nanos as f64 / 1_000_000_000.0),
                RtObject::StringBuilder(buf) => buf.clone(),
                RtObject::Pojo(_) => "<pojo>".to_string(),
            },
        }
    }

    /// Is this value JVM `null`?
    pub fn is_null(&self) -> bool {
        matches!(self, RtValue::Null)
    }
}

/// Converts an interpreted [`RtValue`] into the caller's expected output
/// type (the `Evaluator<Out>` boundary). Implemented for the handful of
/// types a generated evaluator can realistically return.
pub trait FromRtValue: Sized {
    /// Convert, or fail with [`EvaluationError::TypeMismatch`] /
    /// [`EvaluationError::NullPointer`].
    fn from_rt_value(value: RtValue) -> Result<Self, EvaluationError>;
}

macro_rules! impl_from_rt_value_numeric {
    ($ty:ty, $variant:ident) => {
        impl FromRtValue for $ty {
            fn from_rt_value(value: RtValue) -> Result<Self, EvaluationError> {
                match value {
                    RtValue::$variant(v) => Ok(v),
                    RtValue::Null => Err(EvaluationError::NullPointer),
                    other => Err(EvaluationError::TypeMismatch {
                        expected: stringify!($ty),
                        found: other.java_to_string(),
                    }),
                }
            }
        }
    };
}

impl_from_rt_value_numeric!(i32, Int);
impl_from_rt_value_numeric!(i64, Long);
impl_from_rt_value_numeric!(f32, Float);
impl_from_rt_value_numeric!(f64, Double);
impl_from_rt_value_numeric!(bool, Boolean);

impl FromRtValue for String {
    fn from_rt_value(value: RtValue) -> Result<Self, EvaluationError> {
        match value {
            RtValue::Null => Err(EvaluationError::NullPointer),
            other => Ok(other.java_to_string()),
        }
    }
}

impl FromRtValue for RtValue {
    fn from_rt_value(value: RtValue) -> Result<Self, EvaluationError> {
        Ok(value)
    }
}
