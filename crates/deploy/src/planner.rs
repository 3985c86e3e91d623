//! Dependency-ordered deployment planning.

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
};

use crate::{
    error::PlanningError,
    manifest::{ContractSpec, WiringStep},
};

/// A validated plan: contracts in deployment order, wiring in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPlan {
    contracts: Vec<ContractSpec>,
    wiring: Vec<WiringStep>,
}

impl DeploymentPlan {
    /// Contracts in the order they must be deployed.
    pub fn contracts(&self) -> &[ContractSpec] {
        &self.contracts
    }

    /// Wiring steps in declaration order.
    pub fn wiring(&self) -> &[WiringStep] {
        &self.wiring
    }

    /// Contract names in deployment order.
    pub fn names(&self) -> Vec<&str> {
        self.contracts.iter().map(|c| c.name.as_str()).collect()
    }
}

impl fmt::Display for DeploymentPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Deployments ===")?;
        for (i, spec) in self.contracts.iter().enumerate() {
            write!(f, "  {}. {}", i + 1, spec.name)?;
            if spec.artifact_name() != spec.name {
                write!(f, " ({})", spec.artifact_name())?;
            }
            if !spec.depends_on.is_empty() {
                write!(f, " after {}", spec.depends_on.join(", "))?;
            }
            writeln!(f)?;
        }

        writeln!(f, "=== Wiring ===")?;
        for (i, step) in self.wiring.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, step.label())?;
        }

        Ok(())
    }
}

/// Computes the deployment order of a set of contract specs.
pub struct DeploymentPlanner;

impl DeploymentPlanner {
    /// Order `specs` so every dependency precedes its dependents.
    ///
    /// Uses Kahn's algorithm; whenever several contracts are ready at once, the
    /// one declared first is deployed first, so the same input always yields
    /// the same plan. Cycles and dangling names are rejected, never repaired.
    pub fn plan(
        specs: &[ContractSpec],
        wiring: &[WiringStep],
    ) -> Result<DeploymentPlan, PlanningError> {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(specs.len());
        for (i, spec) in specs.iter().enumerate() {
            if index.insert(spec.name.as_str(), i).is_some() {
                return Err(PlanningError::DuplicateContract(spec.name.clone()));
            }
        }

        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); specs.len()];
        let mut in_degree = vec![0usize; specs.len()];

        for (i, spec) in specs.iter().enumerate() {
            let mut seen = BTreeSet::new();
            for dependency in &spec.depends_on {
                let &j = index.get(dependency.as_str()).ok_or_else(|| {
                    PlanningError::UnresolvedDependency {
                        contract: spec.name.clone(),
                        dependency: dependency.clone(),
                    }
                })?;
                if seen.insert(j) {
                    dependents[j].push(i);
                    in_degree[i] += 1;
                }
            }

            for reference in spec.references() {
                if !spec.depends_on.iter().any(|d| d == reference) {
                    return Err(PlanningError::UndeclaredReference {
                        contract: spec.name.clone(),
                        reference: reference.to_string(),
                    });
                }
            }
        }

        let mut ready: BTreeSet<usize> = (0..specs.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(specs.len());

        while let Some(i) = ready.pop_first() {
            order.push(i);
            for &dependent in &dependents[i] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() < specs.len() {
            let contracts = (0..specs.len())
                .filter(|&i| in_degree[i] > 0)
                .map(|i| specs[i].name.clone())
                .collect();
            return Err(PlanningError::CyclicDependency { contracts });
        }

        for step in wiring {
            if let Some(reference) = step.references().find(|r| !index.contains_key(r)) {
                return Err(PlanningError::UnknownWiringReference {
                    step: step.label(),
                    reference: reference.to_string(),
                });
            }
        }

        let contracts: Vec<ContractSpec> = order.into_iter().map(|i| specs[i].clone()).collect();
        tracing::debug!(
            order = ?contracts.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            wiring_steps = wiring.len(),
            "Deployment plan computed"
        );

        Ok(DeploymentPlan {
            contracts,
            wiring: wiring.to_vec(),
        })
    }
}
