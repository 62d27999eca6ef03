//! Built-in template bodies.
//!
//! Placeholders use `{{name}}`; values substituted into quoted strings must
//! already be escaped with [`crate::hcl::escape`].

use crate::error::{TemplateError, TemplateResult};

pub const PROVIDERS_LOCAL: &str = "providers_local";
pub const PROVIDERS_TFC: &str = "providers_tfc";
pub const INSTANCES: &str = "instances";
pub const EXTERNAL_TFE: &str = "external_tfe";
pub const EXTERNAL_REMOTE_STATE: &str = "external_remote_state";
pub const IMPORT_BLOCK: &str = "import_block";
pub const MODULE_ELIGIBILITY_MAIN: &str = "module_eligibility_main";
pub const MODULE_ELIGIBILITY_VARIABLES: &str = "module_eligibility_variables";
pub const MODULE_APPROVER_MAIN: &str = "module_approver_main";
pub const MODULE_APPROVER_VARIABLES: &str = "module_approver_variables";

const PROVIDERS_LOCAL_BODY: &str = r#"terraform {
  required_version = ">= 1.5.0"

  required_providers {
    aws = {
      source  = "hashicorp/aws"
      version = "~> {{aws_version}}"
    }
  }

  backend "local" {
    path = "terraform.tfstate"
  }
}

provider "aws" {
  region = "{{region}}"
}
"#;

const PROVIDERS_TFC_BODY: &str = r#"terraform {
  required_version = ">= 1.5.0"

  required_providers {
    aws = {
      source  = "hashicorp/aws"
      version = "~> {{aws_version}}"
    }
    tfe = {
      source  = "hashicorp/tfe"
      version = "~> {{tfe_version}}"
    }
  }

  cloud {
    organization = "{{organization}}"

    workspaces {
      name = "{{workspace}}"
    }
  }
}

provider "aws" {
  region = "{{region}}"
}
"#;

const INSTANCES_BODY: &str = r#"data "aws_ssoadmin_instances" "this" {}

locals {
  instance_arn      = tolist(data.aws_ssoadmin_instances.this.arns)[0]
  identity_store_id = tolist(data.aws_ssoadmin_instances.this.identity_store_ids)[0]
}
"#;

const EXTERNAL_TFE_BODY: &str = r#"data "tfe_outputs" "{{component}}" {
  organization = "{{organization}}"
  workspace    = "{{workspace}}"
}
"#;

const EXTERNAL_REMOTE_STATE_BODY: &str = r#"data "terraform_remote_state" "{{component}}" {
  backend = "local"

  config = {
    path = "../{{component}}/terraform.tfstate"
  }
}
"#;

const IMPORT_BLOCK_BODY: &str = r#"import {
  to = {{to}}
  id = "{{id}}"
}
"#;

const MODULE_ELIGIBILITY_MAIN_BODY: &str = r#"resource "aws_dynamodb_table_item" "this" {
  table_name = var.table_name
  hash_key   = "id"

  item = jsonencode({
    id               = { S = var.entity_id }
    name             = { S = var.entity_name }
    type             = { S = var.entity_type }
    accounts         = { L = [for a in var.accounts : { M = { name = { S = a.name }, id = { S = a.id } } }] }
    ous              = { L = [for o in var.ous : { M = { name = { S = o.name }, id = { S = o.id } } }] }
    permissions      = { L = [for p in var.permissions : { M = { name = { S = p.name }, id = { S = p.id } } }] }
    duration         = { S = tostring(var.duration) }
    approvalRequired = { BOOL = var.approval_required }
    ticketNo         = { S = var.ticket_no }
    modifiedBy       = { S = "terraform" }
  })
}
"#;

const MODULE_ELIGIBILITY_VARIABLES_BODY: &str = r#"variable "table_name" {
  type = string
}

variable "entity_id" {
  type = string
}

variable "entity_name" {
  type = string
}

variable "entity_type" {
  type = string
}

variable "accounts" {
  type = list(object({
    name = string
    id   = string
  }))
  default = []
}

variable "ous" {
  type = list(object({
    name = string
    id   = string
  }))
  default = []
}

variable "permissions" {
  type = list(object({
    name = string
    id   = string
  }))
  default = []
}

variable "duration" {
  type = number
}

variable "approval_required" {
  type = bool
}

variable "ticket_no" {
  type    = string
  default = ""
}
"#;

const MODULE_APPROVER_MAIN_BODY: &str = r#"resource "aws_dynamodb_table_item" "this" {
  table_name = var.table_name
  hash_key   = "id"

  item = jsonencode({
    id         = { S = var.entity_id }
    name       = { S = var.entity_name }
    type       = { S = var.entity_type }
    approvers  = { L = [for g in var.approvers : { S = g }] }
    groupIds   = { L = [for id in var.approver_group_ids : { S = id }] }
    ticketNo   = { S = var.ticket_no }
    modifiedBy = { S = "terraform" }
  })
}
"#;

const MODULE_APPROVER_VARIABLES_BODY: &str = r#"variable "table_name" {
  type = string
}

variable "entity_id" {
  type = string
}

variable "entity_name" {
  type = string
}

variable "entity_type" {
  type = string
}

variable "approvers" {
  type    = list(string)
  default = []
}

variable "approver_group_ids" {
  type    = list(string)
  default = []
}

variable "ticket_no" {
  type    = string
  default = ""
}
"#;

/// Registry of built-in templates.
pub struct BuiltinTemplates;

impl BuiltinTemplates {
    /// Look up a template body by name.
    pub fn get(name: &str) -> TemplateResult<&'static str> {
        let body = match name {
            PROVIDERS_LOCAL => PROVIDERS_LOCAL_BODY,
            PROVIDERS_TFC => PROVIDERS_TFC_BODY,
            INSTANCES => INSTANCES_BODY,
            EXTERNAL_TFE => EXTERNAL_TFE_BODY,
            EXTERNAL_REMOTE_STATE => EXTERNAL_REMOTE_STATE_BODY,
            IMPORT_BLOCK => IMPORT_BLOCK_BODY,
            MODULE_ELIGIBILITY_MAIN => MODULE_ELIGIBILITY_MAIN_BODY,
            MODULE_ELIGIBILITY_VARIABLES => MODULE_ELIGIBILITY_VARIABLES_BODY,
            MODULE_APPROVER_MAIN => MODULE_APPROVER_MAIN_BODY,
            MODULE_APPROVER_VARIABLES => MODULE_APPROVER_VARIABLES_BODY,
            _ => return Err(TemplateError::NotFound(name.to_string())),
        };
        Ok(body)
    }

    /// Names of all built-in templates.
    pub fn names() -> &'static [&'static str] {
        &[
            PROVIDERS_LOCAL,
            PROVIDERS_TFC,
            INSTANCES,
            EXTERNAL_TFE,
            EXTERNAL_REMOTE_STATE,
            IMPORT_BLOCK,
            MODULE_ELIGIBILITY_MAIN,
            MODULE_ELIGIBILITY_VARIABLES,
            MODULE_APPROVER_MAIN,
            MODULE_APPROVER_VARIABLES,
        ]
    }
}
