pub mod controller;
pub mod rules;
pub mod validator;
