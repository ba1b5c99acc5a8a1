//! Optimization backend
//!
//! Operations talk to the solver through [`OptimizationBackend`], which
//! answers feasibility, minimization and maximization queries over a
//! [`SymbolicModel`]. [`SearchBackend`] is a depth-first branch-and-bound
//! over the finite variable domains.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::domain::SerialNumber;
use crate::model::SymbolicModel;

/// Time budget of one backend call
pub const TIME_BUDGET: Duration = Duration::from_secs(3);

/// Search nodes visited between deadline checks
const DEADLINE_POLL: u64 = 4096;

const EPSILON: f64 = 1e-9;

/// Serial chosen for each variable
pub type Assignment = BTreeMap<String, SerialNumber>;

/// One question put to a backend
#[derive(Debug, Clone)]
pub struct Query<'a> {
    pub model: &'a SymbolicModel,
    /// Variables fixed to one serial
    pub pins: BTreeMap<String, SerialNumber>,
    /// Inclusive bounds on the objective value
    pub bounds: Option<(f64, f64)>,
    /// Value the objective should come closest to when minimizing
    pub target: Option<f64>,
    /// Assignments the answer must differ from
    pub exclusions: Vec<Assignment>,
    pub deadline: Instant,
}

impl<'a> Query<'a> {
    pub fn new(model: &'a SymbolicModel, deadline: Instant) -> Self {
        Self {
            model,
            pins: BTreeMap::new(),
            bounds: None,
            target: None,
            exclusions: Vec::new(),
            deadline,
        }
    }

    pub fn with_pins(mut self, pins: BTreeMap<String, SerialNumber>) -> Self {
        self.pins = pins;
        self
    }

    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        self.bounds = Some((min, max));
        self
    }

    /// Minimize the distance between the objective and `target` instead
    pub fn with_target(mut self, target: f64) -> Self {
        self.target = Some(target);
        self
    }

    /// Exclude a previously found assignment
    pub fn exclude(&mut self, assignment: Assignment) {
        self.exclusions.push(assignment);
    }
}

/// Answer to a query
#[derive(Debug, Clone, PartialEq)]
pub enum SolveStatus {
    /// A satisfying (and, for optimization, optimal) assignment
    Sat(Assignment),
    /// No assignment satisfies the query
    Unsat,
    /// The backend gave up, usually at the deadline
    Unknown(String),
}

/// Solver capability used by every operation
pub trait OptimizationBackend: Send + Sync {
    /// Any assignment satisfying the query
    fn check(&self, query: &Query<'_>) -> SolveStatus;

    /// An assignment with the lowest objective value, or with the objective
    /// closest to the query's target when it has one
    fn minimize(&self, query: &Query<'_>) -> SolveStatus;

    /// An assignment with the highest objective value
    fn maximize(&self, query: &Query<'_>) -> SolveStatus;
}

/// Depth-first branch-and-bound search
///
/// Variables are visited smallest domain first; values are tried in the
/// order of their objective term. Without an objective every term is zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchBackend;

impl OptimizationBackend for SearchBackend {
    fn check(&self, query: &Query<'_>) -> SolveStatus {
        run(query, Sense::Feasible)
    }

    fn minimize(&self, query: &Query<'_>) -> SolveStatus {
        run(query, Sense::Minimize)
    }

    fn maximize(&self, query: &Query<'_>) -> SolveStatus {
        run(query, Sense::Maximize)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sense {
    Feasible,
    Minimize,
    Maximize,
}

fn run(query: &Query<'_>, sense: Sense) -> SolveStatus {
    let start = Instant::now();
    let Some(mut search) = Search::prepare(query, sense) else {
        debug!(root = %query.model.root, "empty domain, query is unsatisfiable");
        return SolveStatus::Unsat;
    };

    search.descend(0, 0.0);
    debug!(
        root = %query.model.root,
        ?sense,
        nodes = search.nodes,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "search finished"
    );

    if search.expired {
        return SolveStatus::Unknown(format!(
            "deadline exceeded after {} search nodes",
            search.nodes
        ));
    }
    match search.best {
        Some((_, serials)) => SolveStatus::Sat(
            search
                .names
                .iter()
                .map(|name| name.to_string())
                .zip(serials)
                .collect(),
        ),
        None => SolveStatus::Unsat,
    }
}

struct Search<'q> {
    names: Vec<&'q str>,
    values: Vec<Vec<(SerialNumber, f64)>>,
    suffix_min: Vec<f64>,
    suffix_max: Vec<f64>,
    scale: f64,
    bounds: Option<(f64, f64)>,
    target: Option<f64>,
    exclusions: Vec<Vec<Option<SerialNumber>>>,
    deadline: Instant,
    sense: Sense,
    nodes: u64,
    expired: bool,
    current: Vec<SerialNumber>,
    best: Option<(f64, Vec<SerialNumber>)>,
}

impl<'q> Search<'q> {
    /// `None` if some variable has no admissible value
    fn prepare(query: &'q Query<'q>, sense: Sense) -> Option<Self> {
        let model = query.model;
        let objective = model.objective.as_ref();

        let mut entries: Vec<(&'q str, Vec<(SerialNumber, f64)>)> = Vec::with_capacity(model.len());
        for (name, variable) in &model.variables {
            let pin = query.pins.get(name);
            let mut values: Vec<(SerialNumber, f64)> = variable
                .domain()
                .into_iter()
                .filter(|serial| pin.map_or(true, |p| p == serial))
                .map(|serial| (serial, objective.map_or(0.0, |o| o.term(name, serial))))
                .collect();
            if values.is_empty() {
                return None;
            }
            match sense {
                Sense::Maximize => values.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))),
                _ => values.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0))),
            }
            entries.push((name.as_str(), values));
        }
        entries.sort_by(|a, b| a.1.len().cmp(&b.1.len()).then(a.0.cmp(b.0)));

        let mut suffix_min = vec![0.0; entries.len() + 1];
        let mut suffix_max = vec![0.0; entries.len() + 1];
        for (i, (_, values)) in entries.iter().enumerate().rev() {
            let low = values.iter().map(|v| v.1).fold(f64::INFINITY, f64::min);
            let high = values.iter().map(|v| v.1).fold(f64::NEG_INFINITY, f64::max);
            suffix_min[i] = suffix_min[i + 1] + low;
            suffix_max[i] = suffix_max[i + 1] + high;
        }

        let (names, values): (Vec<&str>, Vec<Vec<(SerialNumber, f64)>>) = entries.into_iter().unzip();
        let exclusions = query
            .exclusions
            .iter()
            .map(|excluded| names.iter().map(|name| excluded.get(*name).copied()).collect())
            .collect();
        let divisor = objective.map_or(1, |o| o.divisor.max(1));

        Some(Self {
            current: Vec::with_capacity(names.len()),
            names,
            values,
            suffix_min,
            suffix_max,
            scale: 1.0 / f64::from(divisor),
            bounds: query.bounds,
            target: query.target.filter(|_| sense == Sense::Minimize),
            exclusions,
            deadline: query.deadline,
            sense,
            nodes: 0,
            expired: false,
            best: None,
        })
    }

    /// Returns true when the search must stop
    fn descend(&mut self, depth: usize, partial: f64) -> bool {
        self.nodes += 1;
        if (self.nodes - 1) % DEADLINE_POLL == 0 && Instant::now() >= self.deadline {
            self.expired = true;
        }
        if self.expired {
            return true;
        }

        let low = (partial + self.suffix_min[depth]) * self.scale;
        let high = (partial + self.suffix_max[depth]) * self.scale;
        if let Some((min, max)) = self.bounds {
            if low > max + EPSILON || high < min - EPSILON {
                return false;
            }
        }
        if let Some((best, _)) = &self.best {
            let hopeless = match self.sense {
                Sense::Minimize => self.cost_floor(low, high) >= *best,
                Sense::Maximize => high <= *best,
                Sense::Feasible => false,
            };
            if hopeless {
                return false;
            }
        }

        if depth == self.names.len() {
            if self.is_excluded() {
                return false;
            }
            self.best = Some((self.cost(partial * self.scale), self.current.clone()));
            return self.sense == Sense::Feasible;
        }

        for index in 0..self.values[depth].len() {
            let (serial, term) = self.values[depth][index];
            self.current.push(serial);
            let stop = self.descend(depth + 1, partial + term);
            self.current.pop();
            if stop {
                return true;
            }
        }
        false
    }

    /// What the search ranks a complete assignment by
    fn cost(&self, value: f64) -> f64 {
        self.target.map_or(value, |target| (value - target).abs())
    }

    /// Lowest cost reachable with objective values in `[low, high]`
    fn cost_floor(&self, low: f64, high: f64) -> f64 {
        match self.target {
            Some(target) => (low - target).max(target - high).max(0.0),
            None => low,
        }
    }

    fn is_excluded(&self) -> bool {
        self.exclusions.iter().any(|excluded| {
            excluded
                .iter()
                .zip(&self.current)
                .all(|(e, c)| *e == Some(*c))
        })
    }
}
