//! Scenario definition execution

use bevy::log::info;
use bevy::math::Vec3;
use std::collections::HashMap;
use std::time::Duration;

use crate::controller::{Scenario, TestController, run_scenario};
use crate::dynveg;
use crate::entity::EditorEntity;
use crate::error::{HarnessError, HarnessResult};
use crate::host::{HostClient, Value};
use crate::report::RunReport;
use crate::settings::HarnessSettings;

use super::parser::{EntityDef, Expectation, PropertyDef, PropertyValueDef, ScenarioDefinition};

/// A parsed definition, runnable as a [`Scenario`]
pub struct DefinitionScenario<'a> {
    def: &'a ScenarioDefinition,
}

impl<'a> DefinitionScenario<'a> {
    pub fn new(def: &'a ScenarioDefinition) -> Self {
        Self { def }
    }
}

/// Run `def` against `host`
pub fn run_definition(
    host: &dyn HostClient,
    def: &ScenarioDefinition,
    settings: &HarnessSettings,
) -> RunReport {
    run_scenario(host, &DefinitionScenario::new(def), settings)
}

impl Scenario for DefinitionScenario<'_> {
    fn name(&self) -> &str {
        &self.def.name
    }

    fn level_name(&self) -> &str {
        &self.def.level.name
    }

    fn run(&self, controller: &mut TestController<'_>) -> HarnessResult<()> {
        if let Some(description) = &self.def.description {
            info!("{}: {}", controller.prefix(), description.trim());
        }
        controller.create_level(&self.def.level, &self.def.camera.pose())?;

        let mut entities = HashMap::new();
        for def in &self.def.entities {
            let entity = build_entity(controller, def)?;
            entities.insert(def.name.clone(), entity);
        }
        controller.scene_populated();

        for expectation in &self.def.expect {
            check_expectation(controller, &entities, expectation)?;
        }
        controller.verified();
        Ok(())
    }
}

fn build_entity(controller: &mut TestController<'_>, def: &EntityDef) -> HarnessResult<EditorEntity> {
    let names: Vec<&str> = def.components.iter().map(String::as_str).collect();
    let builder = controller.builder();
    let mut entity = builder.create_entity(&def.name, Vec3::from_array(def.position), &names)?;
    for name in &def.add_components {
        builder.add_component_by_name(&mut entity, name)?;
    }

    for property in &def.properties {
        apply_property(controller, &entity, property)?;
    }

    if let Some(scale) = def.uniform_scale {
        controller.builder().set_local_uniform_scale(&entity, scale)?;
    }
    Ok(entity)
}

fn apply_property(
    controller: &mut TestController<'_>,
    entity: &EditorEntity,
    property: &PropertyDef,
) -> HarnessResult<()> {
    let value = match &property.value {
        PropertyValueDef::Bool(b) => Value::Bool(*b),
        PropertyValueDef::Int(i) => Value::Int(*i),
        PropertyValueDef::Float(f) => Value::Float(*f),
        PropertyValueDef::String(s) => Value::String(s.clone()),
        PropertyValueDef::Vector(v) => Value::Vector3(Vec3::from_array(*v)),
        PropertyValueDef::Asset(path) => {
            let reference = controller.resolver().resolve_with(path, property.exact_match);
            if !property.allow_unresolved {
                controller.expect_resolved(&reference);
            }
            Value::Asset(reference.handle)
        }
    };

    match (property.component, property.verify) {
        (index, true) => {
            let index = index.unwrap_or(0);
            let matches = controller
                .builder()
                .get_set_test(entity, index, &property.path, value)?;
            controller.check(&format!("{} {}", entity.name, property.path), matches);
        }
        (Some(index), false) => {
            controller
                .builder()
                .set_component_property(entity, index, &property.path, value)?;
        }
        (None, false) => {
            controller.builder().set_property(entity, &property.path, value)?;
        }
    }
    Ok(())
}

fn check_expectation(
    controller: &mut TestController<'_>,
    entities: &HashMap<String, EditorEntity>,
    expectation: &Expectation,
) -> HarnessResult<()> {
    match expectation {
        Expectation::InstanceCount {
            entity,
            count,
            timeout,
        } => {
            let target = entities.get(entity).ok_or_else(|| {
                HarnessError::Fixture(format!("instance_count names unknown entity '{}'", entity))
            })?;
            let timeout = Duration::try_from_secs_f64(*timeout).map_err(|e| {
                HarnessError::Fixture(format!(
                    "instance_count for '{}': bad timeout {}: {}",
                    entity, timeout, e
                ))
            })?;
            let host = controller.host();
            let expected = *count;
            controller.wait_for_condition(
                &format!("{} instance count {}", entity, expected),
                || {
                    dynveg::validate_instance_count_in_entity_shape(host, target, expected)
                        .unwrap_or(false)
                },
                timeout,
            );
        }
        Expectation::Asset {
            path,
            resolved,
            exact_match,
        } => {
            let reference = controller.resolver().resolve_with(path, *exact_match);
            controller.check(
                &format!("asset {} resolved={}", path, resolved),
                reference.is_resolved() == *resolved,
            );
        }
        Expectation::CreationFails { name, components } => {
            let names: Vec<&str> = components.iter().map(String::as_str).collect();
            let position = Vec3::ZERO;
            let failed = match controller.builder().create_entity(name, position, &names) {
                Ok(_) => false,
                Err(HarnessError::Creation(e)) => {
                    info!("'{}' failed to create as expected: {}", name, e);
                    true
                }
                Err(e) => return Err(e),
            };
            controller.check(&format!("{} creation fails", name), failed);
        }
    }
    Ok(())
}
