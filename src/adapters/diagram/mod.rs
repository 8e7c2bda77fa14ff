pub mod puml_exporter;
