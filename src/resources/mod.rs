//! Resource constructs: each renders itself as a CloudFormation resource
//! and validates its rendered form.

pub mod grant;
pub mod table;
