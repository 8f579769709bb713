// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! XML-RPC session against the services daemon.
//!
//! Each [`ServicesRpc::execute`] call performs two round trips:
//!
//! 1. `atheme.login(account, password)` returns an authentication cookie
//! 2. `atheme.command(cookie, account, "*", service, verb, args...)`
//!
//! The cookie is discarded afterwards.

use super::xmlrpc::{self, Response};
use super::{Command, Privilege, ServicesRpc};
use crate::config::RpcConfig;
use crate::error::RpcError;
use reqwest::Client;
use tracing::debug;

/// Fault codes the daemon uses for credential and permission problems.
const FAULT_AUTHFAIL: i32 = 5;
const FAULT_NOPRIVS: i32 = 6;
const FAULT_BADAUTHCOOKIE: i32 = 15;

/// Source address reported to services for every command.
const SOURCE_IP: &str = "*";

struct Credentials {
    account: String,
    password: String,
}

/// Services RPC client over HTTP.
pub struct XmlRpcSession {
    client: Client,
    endpoint: String,
    admin: Credentials,
    user: Credentials,
}

impl XmlRpcSession {
    /// Build a session from the `[rpc]` configuration section.
    pub fn new(config: &RpcConfig) -> Result<Self, RpcError> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            endpoint: config.url(),
            admin: Credentials {
                account: config.admin.clone(),
                password: config.admin_password.clone(),
            },
            user: Credentials {
                account: config.user.clone(),
                password: config.user_password.clone(),
            },
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn credentials(&self, privilege: Privilege) -> &Credentials {
        match privilege {
            Privilege::Admin => &self.admin,
            Privilege::User => &self.user,
        }
    }

    async fn call(&self, body: String) -> Result<Response, RpcError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Transport(format!(
                "{} returned HTTP {}",
                self.endpoint, status
            )));
        }

        let text = response.text().await?;
        xmlrpc::decode_response(&text)
    }

    async fn login(&self, credentials: &Credentials) -> Result<String, RpcError> {
        let body = xmlrpc::encode_call(
            "atheme.login",
            [credentials.account.as_str(), credentials.password.as_str()],
        );
        login_cookie(self.call(body).await?)
    }
}

impl ServicesRpc for XmlRpcSession {
    async fn execute(&self, privilege: Privilege, command: &Command) -> Result<String, RpcError> {
        debug!("services call ({:?}): {}", privilege, command);

        let credentials = self.credentials(privilege);
        let cookie = self.login(credentials).await?;

        let params = [cookie.as_str(), credentials.account.as_str(), SOURCE_IP]
            .into_iter()
            .chain(command.params());
        let body = xmlrpc::encode_call("atheme.command", params);

        command_output(self.call(body).await?)
    }
}

/// Interpret the `atheme.login` response.
fn login_cookie(response: Response) -> Result<String, RpcError> {
    match response {
        Response::Value(cookie) if !cookie.trim().is_empty() => Ok(cookie.trim().to_string()),
        Response::Value(_) => Err(RpcError::Auth("empty authentication cookie".into())),
        Response::Fault { code, message } => {
            Err(RpcError::Auth(format!("login rejected ({}): {}", code, message)))
        }
    }
}

/// Interpret the `atheme.command` response.
fn command_output(response: Response) -> Result<String, RpcError> {
    match response {
        Response::Value(text) => Ok(text),
        Response::Fault { code, message } => match code {
            FAULT_AUTHFAIL | FAULT_NOPRIVS | FAULT_BADAUTHCOOKIE => {
                Err(RpcError::Auth(format!("fault {}: {}", code, message)))
            }
            _ => Err(RpcError::Fault { code, message }),
        },
    }
}
