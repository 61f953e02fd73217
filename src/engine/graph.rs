// Evaluation order for a formula set.
//
// Kahn's algorithm over "formula A reads the target of formula B" edges.
// Ties are broken by declaration order so the same formula set always yields
// the same order.
use super::formula::Formula;
use crate::error::{Error, Result};
use crate::metric::Metric;
use std::collections::{BTreeSet, HashMap, VecDeque};

/// Returns indices into `formulas`, each formula after everything it reads.
pub fn evaluation_order(formulas: &[Formula]) -> Result<Vec<usize>> {
    let mut by_target: HashMap<Metric, usize> = HashMap::with_capacity(formulas.len());
    for (idx, formula) in formulas.iter().enumerate() {
        if formula.target.is_input() {
            return Err(Error::DerivedTargetRequired(formula.target));
        }
        if by_target.insert(formula.target, idx).is_some() {
            return Err(Error::DuplicateFormula(formula.target));
        }
    }

    let mut indegree = vec![0usize; formulas.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); formulas.len()];
    for (idx, formula) in formulas.iter().enumerate() {
        let inputs: BTreeSet<Metric> = formula.expr.inputs().into_iter().collect();
        for input in inputs {
            if let Some(&producer) = by_target.get(&input) {
                indegree[idx] += 1;
                dependents[producer].push(idx);
            }
        }
    }

    let mut ready: VecDeque<usize> = (0..formulas.len()).filter(|i| indegree[*i] == 0).collect();
    let mut order = Vec::with_capacity(formulas.len());
    while let Some(idx) = ready.pop_front() {
        order.push(idx);
        for &next in &dependents[idx] {
            indegree[next] -= 1;
            if indegree[next] == 0 {
                ready.push_back(next);
            }
        }
    }

    if order.len() < formulas.len() {
        let stuck = (0..formulas.len())
            .filter(|i| indegree[*i] > 0)
            .map(|i| formulas[i].target)
            .collect();
        return Err(Error::CycleDetected(stuck));
    }
    Ok(order)
}
