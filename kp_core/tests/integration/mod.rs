mod actuator;
mod capture;
mod common;
mod config;
mod measure;
mod sample;
