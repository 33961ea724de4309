use crate::{ContainerSpec, PipelineError, Result};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub type PipelineId = Uuid;

/// Ordered set of container steps plus their `after` dependencies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: PipelineId,
    pub name: String,
    pub description: Option<String>,
    pub steps: Vec<ContainerSpec>,
    pub dependencies: Vec<Dependency>,
}

/// `step` may only start once `upstream` has finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub upstream: String,
    pub step: String,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            steps: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    /// Add a step. Step names identify steps within a pipeline, so they must
    /// be unique.
    pub fn add_step(&mut self, step: impl Into<ContainerSpec>) -> Result<()> {
        let step = step.into();
        if self.find_step(&step.name).is_some() {
            return Err(PipelineError::DuplicateStep(step.name));
        }
        tracing::info!("Adding step '{}' ({})", step.name, step.image);
        self.steps.push(step);
        Ok(())
    }

    /// Declare that `step` runs after `upstream`
    pub fn after(&mut self, step: &str, upstream: &str) -> Result<()> {
        for name in [step, upstream] {
            if self.find_step(name).is_none() {
                return Err(PipelineError::StepNotFound(name.to_string()));
            }
        }
        let dependency = Dependency {
            upstream: upstream.to_string(),
            step: step.to_string(),
        };
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
        Ok(())
    }

    pub fn find_step(&self, name: &str) -> Option<&ContainerSpec> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Names of the steps `step` waits on
    pub fn upstream_of(&self, step: &str) -> Vec<&str> {
        self.dependencies
            .iter()
            .filter(|d| d.step == step)
            .map(|d| d.upstream.as_str())
            .collect()
    }

    /// Step names in an order that honours every dependency
    pub fn execution_order(&self) -> Result<Vec<&str>> {
        let graph = self.build_graph()?;
        let order = toposort(&graph, None).map_err(|_| PipelineError::CyclicDependency)?;
        Ok(order.into_iter().map(|idx| graph[idx]).collect())
    }

    fn build_graph(&self) -> Result<DiGraph<&str, ()>> {
        let mut graph = DiGraph::new();
        let mut step_to_index: HashMap<&str, NodeIndex> = HashMap::new();

        for step in &self.steps {
            let idx = graph.add_node(step.name.as_str());
            step_to_index.insert(step.name.as_str(), idx);
        }

        for dep in &self.dependencies {
            let from_idx = step_to_index
                .get(dep.upstream.as_str())
                .ok_or_else(|| PipelineError::StepNotFound(dep.upstream.clone()))?;
            let to_idx = step_to_index
                .get(dep.step.as_str())
                .ok_or_else(|| PipelineError::StepNotFound(dep.step.clone()))?;

            graph.add_edge(*from_idx, *to_idx, ());
        }

        Ok(graph)
    }
}
