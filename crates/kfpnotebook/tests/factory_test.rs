// crates/kfpnotebook/tests/factory_test.rs

use kfpcore::{OpError, Value};
use kfpnotebook::NotebookOpFactory;
use std::collections::HashMap;

fn base_config() -> HashMap<String, Value> {
    let mut config = HashMap::new();
    config.insert("name".to_string(), Value::from("test"));
    config.insert("notebook".to_string(), Value::from("test_notebook.ipynb"));
    config.insert("cos_endpoint".to_string(), Value::from("http://testserver:32525"));
    config.insert("cos_bucket".to_string(), Value::from("test_bucket"));
    config.insert("cos_directory".to_string(), Value::from("test_directory"));
    config.insert("cos_dependencies_archive".to_string(), Value::from("test_archive.tgz"));
    config.insert("image".to_string(), Value::from("test/image:dev"));
    config
}

#[test]
fn test_create_from_config() {
    let op = NotebookOpFactory.create(&base_config()).unwrap();
    assert_eq!(op.name(), "test");
    assert_eq!(op.image(), "test/image:dev");
    assert!(op.pipeline_inputs().is_empty());
}

#[test]
fn test_absent_and_null_keys_are_omitted() {
    for key in ["cos_endpoint", "cos_bucket", "cos_directory", "cos_dependencies_archive", "notebook", "name"] {
        let mut config = base_config();
        config.remove(key);
        assert_eq!(
            NotebookOpFactory.create(&config).unwrap_err(),
            OpError::MissingArgument(key.to_string())
        );

        let mut config = base_config();
        config.insert(key.to_string(), Value::Null);
        assert_eq!(
            NotebookOpFactory.create(&config).unwrap_err(),
            OpError::MissingArgument(key.to_string())
        );
    }
}

#[test]
fn test_absent_image_is_invalid_value() {
    let mut config = base_config();
    config.remove("image");
    let err = NotebookOpFactory.create(&config).unwrap_err();
    assert!(matches!(err, OpError::InvalidValue { .. }));
    assert_eq!(err.field(), Some("image"));
}

#[test]
fn test_inputs_as_string_or_array() {
    let mut config = base_config();
    config.insert("pipeline_inputs".to_string(), Value::from("test_input1.txt,test_input2.txt"));
    config.insert(
        "pipeline_outputs".to_string(),
        Value::from(vec!["test_output1.txt", "test_output2.txt"]),
    );

    let op = NotebookOpFactory.create(&config).unwrap();
    assert_eq!(op.pipeline_inputs().to_string(), "test_input1.txt,test_input2.txt");
    assert_eq!(op.pipeline_outputs().to_string(), "test_output1.txt,test_output2.txt");
}

#[test]
fn test_wrong_types_rejected() {
    let mut config = base_config();
    config.insert("pipeline_inputs".to_string(), Value::Number(3.0));
    assert!(matches!(
        NotebookOpFactory.create(&config),
        Err(OpError::InvalidValue { ref field, .. }) if field == "pipeline_inputs"
    ));

    let mut config = base_config();
    config.insert("pipeline_envs".to_string(), Value::from("A=1"));
    assert!(matches!(
        NotebookOpFactory.create(&config),
        Err(OpError::InvalidValue { ref field, .. }) if field == "pipeline_envs"
    ));
}

#[test]
fn test_envs_and_resources_from_config() {
    let mut envs = HashMap::new();
    envs.insert("B_VAR".to_string(), Value::from("b"));
    envs.insert("A_VAR".to_string(), Value::Number(1.0));

    let mut config = base_config();
    config.insert("pipeline_envs".to_string(), Value::from(envs));
    config.insert("mem_request".to_string(), Value::from("2"));
    config.insert("gpu_limit".to_string(), Value::Number(1.0));
    config.insert("cpu_request".to_string(), Value::Number(2.0));

    let op = NotebookOpFactory.create(&config).unwrap();
    let container = op.container();
    let names: Vec<&str> = container.env.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["A_VAR", "B_VAR"]);
    assert_eq!(container.env_value("A_VAR"), Some("1"));
    assert_eq!(container.resources.requests.get("memory").map(String::as_str), Some("2G"));
    assert_eq!(container.resources.requests.get("cpu").map(String::as_str), Some("2"));
    assert_eq!(container.resources.limits.get("nvidia.com/gpu").map(String::as_str), Some("1"));
}

#[test]
fn test_fractional_gpu_rejected() {
    let mut config = base_config();
    config.insert("gpu_limit".to_string(), Value::Number(1.5));
    assert!(matches!(
        NotebookOpFactory.create(&config),
        Err(OpError::InvalidValue { ref field, .. }) if field == "gpu_limit"
    ));
}

#[test]
fn test_metadata_lists_required_params() {
    let metadata = NotebookOpFactory.metadata();
    let required: Vec<&str> = metadata
        .params
        .iter()
        .filter(|p| p.required)
        .map(|p| p.name)
        .collect();
    assert_eq!(
        required,
        vec!["name", "notebook", "cos_endpoint", "cos_bucket", "cos_directory", "cos_dependencies_archive", "image"]
    );
}
