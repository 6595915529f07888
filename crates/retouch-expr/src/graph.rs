//! Arena-based expression graph and the graph-building scalar.
//!
//! A trace is a flat vector of steps; every step references earlier steps
//! by index, never by pointer, so the graph is trivially cloneable and has
//! no ownership cycles. Free parameters (the values an optimizer may move)
//! and fixed inputs (per-pixel layer samples) live in two separate banks,
//! matching the signature of the generated cost function.
//!
//! [`ExprScalar`] is the [`Scalar`] implementation that records into a
//! trace: arithmetic pushes op steps, [`Scalar::invoke`] pushes a call
//! step holding the primitive object itself. Constants created outside any
//! trace (via `Scalar::from_f32`) stay pending and fold arithmetically
//! until they meet a bound operand, at which point they are materialized
//! into that operand's trace.

use crate::{ExprError, PrimitiveFn, Result, Scalar};
use std::cell::RefCell;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::rc::Rc;
use std::sync::Arc;

/// Which parameter bank a parameter step reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamBank {
    /// Free optimization parameters (`paramsA` in generated source).
    Free,
    /// Fixed per-pixel inputs (`paramsB` in generated source).
    Fixed,
}

/// Unary operations recorded in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Negation.
    Neg,
    /// Square root.
    Sqrt,
}

/// Binary operations recorded in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
    /// Power.
    Pow,
}

/// One step in the trace.
#[derive(Clone)]
pub enum Step {
    /// A literal constant.
    Constant(f64),
    /// A parameter read from one of the two banks.
    Param {
        /// Bank the value is read from.
        bank: ParamBank,
        /// Slot within the bank.
        index: usize,
        /// Human-readable name, kept for generated-source comments.
        name: String,
    },
    /// A unary operation over an earlier step.
    Unary {
        /// Operation.
        op: UnaryOp,
        /// Operand step index.
        a: usize,
    },
    /// A binary operation over two earlier steps.
    Binary {
        /// Operation.
        op: BinaryOp,
        /// Left operand step index.
        a: usize,
        /// Right operand step index.
        b: usize,
    },
    /// A call to a registered primitive.
    Call {
        /// The primitive being invoked.
        func: Arc<dyn PrimitiveFn>,
        /// Argument step indices.
        args: Vec<usize>,
    },
    /// Extracts one output of an earlier call step.
    CallOutput {
        /// Call step index.
        call: usize,
        /// Output slot within the call's result vector.
        output: usize,
    },
    /// Marks an earlier step as one of the trace results.
    Result {
        /// Step index holding the value.
        step: usize,
        /// Result slot.
        index: usize,
        /// Label used in generated-source comments.
        label: String,
    },
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Constant(v) => write!(f, "Constant({v})"),
            Step::Param { bank, index, name } => {
                write!(f, "Param({bank:?}[{index}] {name})")
            }
            Step::Unary { op, a } => write!(f, "Unary({op:?} s{a})"),
            Step::Binary { op, a, b } => write!(f, "Binary(s{a} {op:?} s{b})"),
            Step::Call { func, args } => write!(f, "Call({} {args:?})", func.name()),
            Step::CallOutput { call, output } => write!(f, "CallOutput(s{call}[{output}])"),
            Step::Result { step, index, label } => {
                write!(f, "Result([{index}] = s{step} // {label})")
            }
        }
    }
}

/// Output form selected for generated source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceMode {
    /// `template <class T>` body usable with autodiff jet types.
    #[default]
    Templated,
    /// Concrete `float` body.
    Float,
    /// Concrete `double` body.
    Double,
}

impl SourceMode {
    fn type_name(self) -> &'static str {
        match self {
            SourceMode::Templated => "T",
            SourceMode::Float => "float",
            SourceMode::Double => "double",
        }
    }
}

/// A completed (or in-progress) expression trace.
#[derive(Debug, Clone, Default)]
pub struct ExprGraph {
    steps: Vec<Step>,
    free_count: usize,
    fixed_count: usize,
    result_count: usize,
}

impl ExprGraph {
    /// Number of steps recorded so far.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// `true` if the trace has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of free parameters registered.
    pub fn free_param_count(&self) -> usize {
        self.free_count
    }

    /// Number of fixed inputs registered.
    pub fn fixed_param_count(&self) -> usize {
        self.fixed_count
    }

    /// Number of results registered.
    pub fn result_count(&self) -> usize {
        self.result_count
    }

    /// Recorded steps.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    fn push(&mut self, step: Step) -> usize {
        self.steps.push(step);
        self.steps.len() - 1
    }

    /// Evaluates the trace at `f64` with the given parameter banks.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::ParamCountMismatch`] when either bank is
    /// shorter than the trace expects.
    pub fn eval(&self, free: &[f64], fixed: &[f64]) -> Result<Vec<f64>> {
        if free.len() < self.free_count {
            return Err(ExprError::ParamCountMismatch {
                bank: "free",
                expected: self.free_count,
                got: free.len(),
            });
        }
        if fixed.len() < self.fixed_count {
            return Err(ExprError::ParamCountMismatch {
                bank: "fixed",
                expected: self.fixed_count,
                got: fixed.len(),
            });
        }

        let mut values = vec![0.0f64; self.steps.len()];
        let mut call_outputs: Vec<Option<Vec<f64>>> = vec![None; self.steps.len()];
        let mut results = vec![0.0f64; self.result_count];

        for (i, step) in self.steps.iter().enumerate() {
            values[i] = match step {
                Step::Constant(v) => *v,
                Step::Param { bank, index, .. } => match bank {
                    ParamBank::Free => free[*index],
                    ParamBank::Fixed => fixed[*index],
                },
                Step::Unary { op, a } => match op {
                    UnaryOp::Neg => -values[*a],
                    UnaryOp::Sqrt => values[*a].sqrt(),
                },
                Step::Binary { op, a, b } => match op {
                    BinaryOp::Add => values[*a] + values[*b],
                    BinaryOp::Sub => values[*a] - values[*b],
                    BinaryOp::Mul => values[*a] * values[*b],
                    BinaryOp::Div => values[*a] / values[*b],
                    BinaryOp::Pow => values[*a].powf(values[*b]),
                },
                Step::Call { func, args } => {
                    let argv: Vec<f64> = args.iter().map(|&a| values[a]).collect();
                    let out = func.eval64(&argv);
                    let first = out.first().copied().unwrap_or(0.0);
                    call_outputs[i] = Some(out);
                    first
                }
                Step::CallOutput { call, output } => call_outputs[*call]
                    .as_ref()
                    .and_then(|v| v.get(*output).copied())
                    .unwrap_or(0.0),
                Step::Result { step, index, .. } => {
                    results[*index] = values[*step];
                    values[*step]
                }
            };
        }

        Ok(results)
    }

    /// Generates a C++ function body for the external cost-function
    /// collaborator, in the same shape the Ceres harness consumes.
    pub fn to_source(&self, fn_name: &str, mode: SourceMode) -> String {
        let t = mode.type_name();
        let indent = "    ";
        let mut out = String::new();

        if mode == SourceMode::Templated {
            out.push_str("template <class T>\n");
        }
        out.push_str(&format!(
            "vector<{t}> {fn_name}(const {t}* const paramsA, const vector<double> &paramsB)\n"
        ));
        out.push_str("{\n");
        out.push_str(&format!(
            "{indent}vector<{t}> result({});\n{indent}\n",
            self.result_count
        ));

        for (i, step) in self.steps.iter().enumerate() {
            let assign = format!("{indent}const {t} s{i} = ");
            match step {
                Step::Constant(v) => {
                    out.push_str(&format!("{assign}({t}){v:.6};\n"));
                }
                Step::Param { bank, index, name } => {
                    let src = match bank {
                        ParamBank::Free => format!("paramsA[{index}]"),
                        ParamBank::Fixed => format!("paramsB[{index}]"),
                    };
                    out.push_str(&format!("{assign}({t}) {src}; // {name};\n"));
                }
                Step::Unary { op, a } => {
                    let expr = match op {
                        UnaryOp::Neg => format!("-s{a}"),
                        UnaryOp::Sqrt => format!("sqrt(s{a})"),
                    };
                    out.push_str(&format!("{assign}{expr};\n"));
                }
                Step::Binary { op, a, b } => {
                    let expr = match op {
                        BinaryOp::Add => format!("s{a} + s{b}"),
                        BinaryOp::Sub => format!("s{a} - s{b}"),
                        BinaryOp::Mul => format!("s{a} * s{b}"),
                        BinaryOp::Div => format!("s{a} / s{b}"),
                        BinaryOp::Pow => format!("pow(s{a}, s{b})"),
                    };
                    out.push_str(&format!("{assign}{expr};\n"));
                }
                Step::Call { func, args } => {
                    let list: Vec<String> = args.iter().map(|a| format!("s{a}")).collect();
                    out.push_str(&format!(
                        "{indent}vector<{t}> v{i} = {{ {} }};\n",
                        list.join(", ")
                    ));
                    out.push_str(&format!("{indent}auto s{i} = {}(v{i});\n", func.name()));
                }
                Step::CallOutput { call, output } => {
                    out.push_str(&format!("{assign}s{call}[{output}];\n"));
                }
                Step::Result { step, index, label } => {
                    out.push_str(&format!(
                        "{indent}result[{index}] = s{step}; // {label};\n"
                    ));
                }
            }
        }

        out.push_str(&format!("{indent}\n{indent}return result;\n}}\n"));
        out
    }
}

/// Handle used to build a trace.
///
/// Cloning the handle is cheap; all clones share the same underlying
/// graph. When building is complete, [`ExprTrace::into_graph`] extracts
/// the finished [`ExprGraph`].
#[derive(Debug, Clone, Default)]
pub struct ExprTrace {
    inner: Rc<RefCell<ExprGraph>>,
}

impl ExprTrace {
    /// Creates an empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a literal constant.
    pub fn constant(&self, v: f64) -> ExprScalar {
        let index = self.inner.borrow_mut().push(Step::Constant(v));
        self.bound(index)
    }

    /// Registers the next free parameter (bank A).
    pub fn free_param(&self, name: impl Into<String>) -> ExprScalar {
        let mut g = self.inner.borrow_mut();
        let index = g.free_count;
        g.free_count += 1;
        let step = g.push(Step::Param {
            bank: ParamBank::Free,
            index,
            name: name.into(),
        });
        drop(g);
        self.bound(step)
    }

    /// Registers the next fixed input (bank B).
    pub fn fixed_param(&self, name: impl Into<String>) -> ExprScalar {
        let mut g = self.inner.borrow_mut();
        let index = g.fixed_count;
        g.fixed_count += 1;
        let step = g.push(Step::Param {
            bank: ParamBank::Fixed,
            index,
            name: name.into(),
        });
        drop(g);
        self.bound(step)
    }

    /// Marks a scalar as the next trace result.
    pub fn register_result(&self, s: &ExprScalar, label: impl Into<String>) {
        let step = s.materialize(&self.inner);
        let mut g = self.inner.borrow_mut();
        let index = g.result_count;
        g.result_count += 1;
        g.push(Step::Result {
            step,
            index,
            label: label.into(),
        });
    }

    /// Evaluates the trace (see [`ExprGraph::eval`]).
    pub fn eval(&self, free: &[f64], fixed: &[f64]) -> Result<Vec<f64>> {
        self.inner.borrow().eval(free, fixed)
    }

    /// Generates source (see [`ExprGraph::to_source`]).
    pub fn to_source(&self, fn_name: &str, mode: SourceMode) -> String {
        self.inner.borrow().to_source(fn_name, mode)
    }

    /// Extracts the finished graph, cloning if other handles or scalars
    /// still reference it.
    pub fn into_graph(self) -> ExprGraph {
        match Rc::try_unwrap(self.inner) {
            Ok(cell) => cell.into_inner(),
            Err(rc) => rc.borrow().clone(),
        }
    }

    /// Number of free parameters registered so far.
    pub fn free_param_count(&self) -> usize {
        self.inner.borrow().free_count
    }

    /// Number of fixed inputs registered so far.
    pub fn fixed_param_count(&self) -> usize {
        self.inner.borrow().fixed_count
    }

    /// Number of results registered so far.
    pub fn result_count(&self) -> usize {
        self.inner.borrow().result_count
    }

    fn bound(&self, index: usize) -> ExprScalar {
        ExprScalar {
            repr: Repr::Bound {
                graph: Rc::clone(&self.inner),
                index,
            },
        }
    }
}

#[derive(Clone)]
enum Repr {
    /// A step already recorded in a trace.
    Bound {
        graph: Rc<RefCell<ExprGraph>>,
        index: usize,
    },
    /// A constant not yet attached to any trace. Constant arithmetic folds
    /// in this state; the value is materialized as a `Constant` step the
    /// first time it meets a bound operand.
    Pending(f64),
}

/// Graph-building scalar: the symbolic [`Scalar`] implementation.
#[derive(Clone)]
pub struct ExprScalar {
    repr: Repr,
}

impl std::fmt::Debug for ExprScalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.repr {
            Repr::Bound { index, .. } => write!(f, "ExprScalar(s{index})"),
            Repr::Pending(v) => write!(f, "ExprScalar(pending {v})"),
        }
    }
}

impl ExprScalar {
    /// Step index of this scalar, materializing a pending constant into
    /// `graph` if needed.
    fn materialize(&self, graph: &Rc<RefCell<ExprGraph>>) -> usize {
        match &self.repr {
            Repr::Bound { graph: g, index } => {
                assert!(
                    Rc::ptr_eq(g, graph),
                    "expression operands belong to different traces"
                );
                *index
            }
            Repr::Pending(v) => graph.borrow_mut().push(Step::Constant(*v)),
        }
    }

    fn graph(&self) -> Option<&Rc<RefCell<ExprGraph>>> {
        match &self.repr {
            Repr::Bound { graph, .. } => Some(graph),
            Repr::Pending(_) => None,
        }
    }

    fn binary(self, rhs: Self, op: BinaryOp, fold: impl Fn(f64, f64) -> f64) -> Self {
        match (self.graph().cloned(), rhs.graph().cloned()) {
            (None, None) => {
                let (Repr::Pending(a), Repr::Pending(b)) = (&self.repr, &rhs.repr) else {
                    unreachable!()
                };
                ExprScalar {
                    repr: Repr::Pending(fold(*a, *b)),
                }
            }
            (ga, gb) => {
                let graph = ga.or(gb).expect("at least one bound operand");
                let a = self.materialize(&graph);
                let b = rhs.materialize(&graph);
                let index = graph.borrow_mut().push(Step::Binary { op, a, b });
                ExprScalar {
                    repr: Repr::Bound { graph, index },
                }
            }
        }
    }

    fn unary(self, op: UnaryOp, fold: impl Fn(f64) -> f64) -> Self {
        match self.graph().cloned() {
            None => {
                let Repr::Pending(v) = self.repr else { unreachable!() };
                ExprScalar {
                    repr: Repr::Pending(fold(v)),
                }
            }
            Some(graph) => {
                let a = self.materialize(&graph);
                let index = graph.borrow_mut().push(Step::Unary { op, a });
                ExprScalar {
                    repr: Repr::Bound { graph, index },
                }
            }
        }
    }
}

impl Add for ExprScalar {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        self.binary(rhs, BinaryOp::Add, |a, b| a + b)
    }
}

impl Sub for ExprScalar {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self.binary(rhs, BinaryOp::Sub, |a, b| a - b)
    }
}

impl Mul for ExprScalar {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        self.binary(rhs, BinaryOp::Mul, |a, b| a * b)
    }
}

impl Div for ExprScalar {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        self.binary(rhs, BinaryOp::Div, |a, b| a / b)
    }
}

impl Neg for ExprScalar {
    type Output = Self;
    fn neg(self) -> Self {
        self.unary(UnaryOp::Neg, |v| -v)
    }
}

impl Scalar for ExprScalar {
    fn from_f32(v: f32) -> Self {
        ExprScalar {
            repr: Repr::Pending(v as f64),
        }
    }

    fn sqrt(self) -> Self {
        self.unary(UnaryOp::Sqrt, f64::sqrt)
    }

    fn powf(self, e: Self) -> Self {
        self.binary(e, BinaryOp::Pow, f64::powf)
    }

    fn invoke<F: PrimitiveFn + Clone + 'static>(f: &F, args: &[Self]) -> Vec<Self> {
        debug_assert_eq!(args.len(), f.arity());

        let graph = args.iter().find_map(|a| a.graph().cloned());
        let Some(graph) = graph else {
            // All-constant call: fold immediately, stay pending.
            let argv: Vec<f64> = args
                .iter()
                .map(|a| match &a.repr {
                    Repr::Pending(v) => *v,
                    Repr::Bound { .. } => unreachable!(),
                })
                .collect();
            return f
                .eval64(&argv)
                .into_iter()
                .map(|v| ExprScalar {
                    repr: Repr::Pending(v),
                })
                .collect();
        };

        let indices: Vec<usize> = args.iter().map(|a| a.materialize(&graph)).collect();
        let call = graph.borrow_mut().push(Step::Call {
            func: Arc::new(f.clone()),
            args: indices,
        });

        (0..f.results())
            .map(|output| {
                let index = graph.borrow_mut().push(Step::CallOutput { call, output });
                ExprScalar {
                    repr: Repr::Bound {
                        graph: Rc::clone(&graph),
                        index,
                    },
                }
            })
            .collect()
    }
}
