//! Kernel support vector classifier with probability outputs.
//!
//! Pure Rust C-SVC:
//! - SMO solver with maximal-violating-pair working set selection
//! - Per-class penalty weights (`balanced`: `n / (2 * n_class)`)
//! - Linear and RBF kernels
//! - Platt scaling on cross-validated decision values for probabilities

use super::tfidf::SparseVector;
use ndarray::{Array2, ArrayView1};

const TAU: f64 = 1e-12;
const PROBABILITY_FOLDS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    Linear,
    Rbf,
}

/// RBF kernel width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gamma {
    /// `1 / (n_features * var(X))`
    Scale,
    /// `1 / n_features`
    Auto,
    Value(f64),
}

/// Classifier hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvcParams {
    pub c: f64,
    pub kernel: Kernel,
    pub gamma: Gamma,
    /// Stopping tolerance on the KKT violation
    pub tol: f64,
    /// Solver iteration cap; `None` leaves only the internal safety cap
    pub max_iter: Option<usize>,
}

impl Default for SvcParams {
    fn default() -> Self {
        SvcParams {
            c: 1.0,
            kernel: Kernel::Rbf,
            gamma: Gamma::Scale,
            tol: 1e-3,
            max_iter: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct KernelFn {
    kernel: Kernel,
    gamma: f64,
}

impl KernelFn {
    fn resolve(params: &SvcParams, x: &[SparseVector], n_features: usize) -> Self {
        let gamma = match params.gamma {
            Gamma::Value(g) => g,
            Gamma::Auto if n_features > 0 => 1.0 / n_features as f64,
            Gamma::Scale if n_features > 0 && !x.is_empty() => {
                let cells = (x.len() * n_features) as f64;
                let sum: f64 = x.iter().flat_map(|v| v.values.iter()).sum();
                let sum_sq: f64 = x.iter().map(SparseVector::norm_sq).sum();
                let var = sum_sq / cells - (sum / cells).powi(2);
                if var > 0.0 {
                    1.0 / (n_features as f64 * var)
                } else {
                    1.0
                }
            }
            _ => 1.0,
        };
        KernelFn {
            kernel: params.kernel,
            gamma,
        }
    }

    fn eval(&self, a: &SparseVector, a_sq: f64, b: &SparseVector, b_sq: f64) -> f64 {
        let dot = a.dot(b);
        match self.kernel {
            Kernel::Linear => dot,
            Kernel::Rbf => (-self.gamma * (a_sq + b_sq - 2.0 * dot).max(0.0)).exp(),
        }
    }

    fn matrix(&self, x: &[&SparseVector], sq: &[f64]) -> Array2<f64> {
        let n = x.len();
        let mut k = Array2::zeros((n, n));
        for i in 0..n {
            for j in i..n {
                let v = self.eval(x[i], sq[i], x[j], sq[j]);
                k[[i, j]] = v;
                k[[j, i]] = v;
            }
        }
        k
    }
}

/// Decision function `sum(coef_i * K(sv_i, x)) - rho`.
#[derive(Debug, Clone)]
struct DecisionFunction {
    kernel: KernelFn,
    support: Vec<SparseVector>,
    support_sq: Vec<f64>,
    /// `alpha_i * y_i` per support vector
    coef: Vec<f64>,
    rho: f64,
}

impl DecisionFunction {
    fn eval(&self, x: &SparseVector) -> f64 {
        let x_sq = x.norm_sq();
        self.support
            .iter()
            .zip(&self.support_sq)
            .zip(&self.coef)
            .map(|((sv, &sq), &c)| c * self.kernel.eval(sv, sq, x, x_sq))
            .sum::<f64>()
            - self.rho
    }
}

#[derive(Debug, Clone)]
enum Model {
    /// Training labels held a single class
    Constant { label: bool, probability: f64 },
    Kernel {
        decision: DecisionFunction,
        /// Platt parameters: `P(y=1|f) = 1 / (1 + exp(a * f + b))`
        sigmoid: (f64, f64),
    },
}

/// A fitted binary classifier.
#[derive(Debug, Clone)]
pub struct Svc {
    model: Model,
}

impl Svc {
    /// Fit on `x` with binary labels `y`.
    pub fn fit(params: &SvcParams, x: &[SparseVector], y: ArrayView1<bool>, n_features: usize) -> Self {
        let n_pos = y.iter().filter(|&&v| v).count();
        let n = y.len();
        if n_pos == 0 || n_pos == n {
            return Svc {
                model: Model::Constant {
                    label: n_pos > 0,
                    probability: (n_pos as f64 + 1.0) / (n as f64 + 2.0),
                },
            };
        }

        let kernel = KernelFn::resolve(params, x, n_features);
        let rows: Vec<usize> = (0..n).collect();
        let labels: Vec<bool> = y.to_vec();
        let weights = balanced_weights(&labels, &rows);
        let decision = train_decision(params, kernel, weights, x, &labels, &rows);

        let cv_values = cross_validated_decisions(params, kernel, weights, x, &labels)
            .unwrap_or_else(|| x.iter().map(|xi| decision.eval(xi)).collect());
        let sigmoid = fit_sigmoid(&cv_values, &labels);

        Svc {
            model: Model::Kernel { decision, sigmoid },
        }
    }

    pub fn decision_function(&self, x: &SparseVector) -> f64 {
        match &self.model {
            Model::Constant { label, .. } => {
                if *label {
                    1.0
                } else {
                    -1.0
                }
            }
            Model::Kernel { decision, .. } => decision.eval(x),
        }
    }

    pub fn predict(&self, x: &SparseVector) -> bool {
        match &self.model {
            Model::Constant { label, .. } => *label,
            Model::Kernel { decision, .. } => decision.eval(x) > 0.0,
        }
    }

    /// Probability of the positive class.
    pub fn predict_proba(&self, x: &SparseVector) -> f64 {
        match &self.model {
            Model::Constant { probability, .. } => *probability,
            Model::Kernel { decision, sigmoid } => sigmoid_predict(decision.eval(x), *sigmoid),
        }
    }

    /// Number of support vectors; zero for a constant model.
    pub fn n_support(&self) -> usize {
        match &self.model {
            Model::Constant { .. } => 0,
            Model::Kernel { decision, .. } => decision.support.len(),
        }
    }
}

/// `balanced` class weights `n / (2 * n_class)` over `rows`, as
/// `(positive, negative)`.
fn balanced_weights(labels: &[bool], rows: &[usize]) -> (f64, f64) {
    let n = rows.len();
    let n_pos = rows.iter().filter(|&&r| labels[r]).count();
    (
        n as f64 / (2.0 * n_pos.max(1) as f64),
        n as f64 / (2.0 * (n - n_pos).max(1) as f64),
    )
}

/// Solve the dual on the given rows and keep the support vectors.
///
/// `weights` scale `C` per class and come from the full fit set, so the
/// probability folds share the bounds of the final model.
fn train_decision(
    params: &SvcParams,
    kernel: KernelFn,
    (w_pos, w_neg): (f64, f64),
    x: &[SparseVector],
    labels: &[bool],
    rows: &[usize],
) -> DecisionFunction {
    let n = rows.len();

    let xs: Vec<&SparseVector> = rows.iter().map(|&r| &x[r]).collect();
    let sq: Vec<f64> = xs.iter().map(|v| v.norm_sq()).collect();
    let y: Vec<f64> = rows.iter().map(|&r| if labels[r] { 1.0 } else { -1.0 }).collect();
    let upper: Vec<f64> = rows
        .iter()
        .map(|&r| params.c * if labels[r] { w_pos } else { w_neg })
        .collect();

    let k = kernel.matrix(&xs, &sq);
    let max_iter = params.max_iter.unwrap_or_else(|| (100 * n).max(10_000_000));
    let (alpha, rho) = solve_smo(&k, &y, &upper, params.tol, max_iter);

    let mut decision = DecisionFunction {
        kernel,
        support: Vec::new(),
        support_sq: Vec::new(),
        coef: Vec::new(),
        rho,
    };
    for (t, &a) in alpha.iter().enumerate() {
        if a > 0.0 {
            decision.support.push(xs[t].clone());
            decision.support_sq.push(sq[t]);
            decision.coef.push(a * y[t]);
        }
    }
    decision
}

/// SMO over the C-SVC dual with per-sample upper bounds. Returns the dual
/// coefficients and the offset `rho`.
fn solve_smo(k: &Array2<f64>, y: &[f64], upper: &[f64], tol: f64, max_iter: usize) -> (Vec<f64>, f64) {
    let n = y.len();
    let mut alpha = vec![0.0; n];
    let mut grad = vec![-1.0; n];
    let is_up = |t: usize, a: &[f64]| (y[t] > 0.0 && a[t] < upper[t]) || (y[t] < 0.0 && a[t] > 0.0);
    let is_low = |t: usize, a: &[f64]| (y[t] > 0.0 && a[t] > 0.0) || (y[t] < 0.0 && a[t] < upper[t]);

    let mut iterations = 0;
    while iterations < max_iter {
        let mut g_max = f64::NEG_INFINITY;
        let mut g_min = f64::INFINITY;
        let (mut i, mut j) = (usize::MAX, usize::MAX);
        for t in 0..n {
            let yg = -y[t] * grad[t];
            if is_up(t, &alpha) && yg > g_max {
                g_max = yg;
                i = t;
            }
            if is_low(t, &alpha) && yg < g_min {
                g_min = yg;
                j = t;
            }
        }
        if i == usize::MAX || j == usize::MAX || g_max - g_min < tol {
            break;
        }
        iterations += 1;

        let (c_i, c_j) = (upper[i], upper[j]);
        let (old_i, old_j) = (alpha[i], alpha[j]);
        let q_ij = y[i] * y[j] * k[[i, j]];

        if y[i] != y[j] {
            let quad = (k[[i, i]] + k[[j, j]] + 2.0 * q_ij).max(TAU);
            let delta = (-grad[i] - grad[j]) / quad;
            let diff = alpha[i] - alpha[j];
            alpha[i] += delta;
            alpha[j] += delta;
            if diff > 0.0 {
                if alpha[j] < 0.0 {
                    alpha[j] = 0.0;
                    alpha[i] = diff;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = -diff;
            }
            if diff > c_i - c_j {
                if alpha[i] > c_i {
                    alpha[i] = c_i;
                    alpha[j] = c_i - diff;
                }
            } else if alpha[j] > c_j {
                alpha[j] = c_j;
                alpha[i] = c_j + diff;
            }
        } else {
            let quad = (k[[i, i]] + k[[j, j]] - 2.0 * q_ij).max(TAU);
            let delta = (grad[i] - grad[j]) / quad;
            let sum = alpha[i] + alpha[j];
            alpha[i] -= delta;
            alpha[j] += delta;
            if sum > c_i {
                if alpha[i] > c_i {
                    alpha[i] = c_i;
                    alpha[j] = sum - c_i;
                }
            } else if alpha[j] < 0.0 {
                alpha[j] = 0.0;
                alpha[i] = sum;
            }
            if sum > c_j {
                if alpha[j] > c_j {
                    alpha[j] = c_j;
                    alpha[i] = sum - c_j;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = sum;
            }
        }

        let (d_i, d_j) = (alpha[i] - old_i, alpha[j] - old_j);
        for t in 0..n {
            grad[t] += y[t] * y[i] * k[[t, i]] * d_i + y[t] * y[j] * k[[t, j]] * d_j;
        }
    }
    if iterations == max_iter {
        tracing::warn!(max_iter, "SMO stopped at the iteration cap");
    }

    // Offset: mean over free vectors, else midpoint of the feasible interval
    let (mut ub, mut lb) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut free_sum, mut n_free) = (0.0, 0usize);
    for t in 0..n {
        let yg = y[t] * grad[t];
        if alpha[t] >= upper[t] {
            if y[t] < 0.0 {
                ub = ub.min(yg);
            } else {
                lb = lb.max(yg);
            }
        } else if alpha[t] <= 0.0 {
            if y[t] > 0.0 {
                ub = ub.min(yg);
            } else {
                lb = lb.max(yg);
            }
        } else {
            free_sum += yg;
            n_free += 1;
        }
    }
    let rho = if n_free > 0 {
        free_sum / n_free as f64
    } else {
        (ub + lb) / 2.0
    };
    (alpha, rho)
}

/// Decision values for every row from models that did not see it.
///
/// Rows are assigned to folds by position modulo the fold count. A fold whose
/// training part holds one class scores its held-out rows as that class.
fn cross_validated_decisions(
    params: &SvcParams,
    kernel: KernelFn,
    weights: (f64, f64),
    x: &[SparseVector],
    labels: &[bool],
) -> Option<Vec<f64>> {
    let n = labels.len();
    if n < PROBABILITY_FOLDS {
        return None;
    }
    let mut values = vec![0.0; n];
    for fold in 0..PROBABILITY_FOLDS {
        let (held, train): (Vec<usize>, Vec<usize>) =
            (0..n).partition(|r| r % PROBABILITY_FOLDS == fold);
        let n_pos = train.iter().filter(|&&r| labels[r]).count();
        if n_pos == 0 || n_pos == train.len() {
            let value = if n_pos > 0 { 1.0 } else { -1.0 };
            for r in held {
                values[r] = value;
            }
            continue;
        }
        let decision = train_decision(params, kernel, weights, x, labels, &train);
        for r in held {
            values[r] = decision.eval(&x[r]);
        }
    }
    Some(values)
}

/// Fit Platt's sigmoid by Newton's method with backtracking line search.
fn fit_sigmoid(decisions: &[f64], labels: &[bool]) -> (f64, f64) {
    let prior1 = labels.iter().filter(|&&l| l).count() as f64;
    let prior0 = labels.len() as f64 - prior1;
    let hi = (prior1 + 1.0) / (prior1 + 2.0);
    let lo = 1.0 / (prior0 + 2.0);
    let targets: Vec<f64> = labels.iter().map(|&l| if l { hi } else { lo }).collect();

    let objective = |a: f64, b: f64| -> f64 {
        decisions
            .iter()
            .zip(&targets)
            .map(|(&f, &t)| {
                let fab = f * a + b;
                if fab >= 0.0 {
                    t * fab + (-fab).exp().ln_1p()
                } else {
                    (t - 1.0) * fab + fab.exp().ln_1p()
                }
            })
            .sum()
    };

    let (mut a, mut b) = (0.0, ((prior0 + 1.0) / (prior1 + 1.0)).ln());
    let mut fval = objective(a, b);
    for _ in 0..100 {
        let (mut h11, mut h22, mut h21, mut g1, mut g2) = (1e-12, 1e-12, 0.0, 0.0, 0.0);
        for (&f, &t) in decisions.iter().zip(&targets) {
            let fab = f * a + b;
            let (p, q) = if fab >= 0.0 {
                let e = (-fab).exp();
                (e / (1.0 + e), 1.0 / (1.0 + e))
            } else {
                let e = fab.exp();
                (1.0 / (1.0 + e), e / (1.0 + e))
            };
            let d2 = p * q;
            h11 += f * f * d2;
            h22 += d2;
            h21 += f * d2;
            let d1 = t - p;
            g1 += f * d1;
            g2 += d1;
        }
        if g1.abs() < 1e-5 && g2.abs() < 1e-5 {
            break;
        }

        let det = h11 * h22 - h21 * h21;
        let da = -(h22 * g1 - h21 * g2) / det;
        let db = -(-h21 * g1 + h11 * g2) / det;
        let gd = g1 * da + g2 * db;

        let mut step = 1.0;
        while step >= 1e-10 {
            let (na, nb) = (a + step * da, b + step * db);
            let nf = objective(na, nb);
            if nf < fval + 1e-4 * step * gd {
                a = na;
                b = nb;
                fval = nf;
                break;
            }
            step /= 2.0;
        }
        if step < 1e-10 {
            break;
        }
    }
    (a, b)
}

fn sigmoid_predict(decision: f64, (a, b): (f64, f64)) -> f64 {
    let fab = decision * a + b;
    if fab >= 0.0 {
        let e = (-fab).exp();
        e / (1.0 + e)
    } else {
        1.0 / (1.0 + fab.exp())
    }
}
