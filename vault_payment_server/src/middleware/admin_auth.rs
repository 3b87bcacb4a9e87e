//! Bearer-token middleware for the admin routes.
//!
//! Wrap the `/admin` scope with [`AdminAuthMiddlewareFactory`]. Requests must carry
//! `Authorization: Bearer <VPG_ADMIN_TOKEN>`, otherwise a 401 is returned and the route is never called.
//! If no admin token is configured, every request is refused.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error,
};
use futures::future::LocalBoxFuture;
use log::*;
use vpg_common::Secret;

use crate::{errors::ServerError, helpers::constant_time_eq};

pub struct AdminAuthMiddlewareFactory {
    token: Secret<String>,
}

impl AdminAuthMiddlewareFactory {
    pub fn new(token: Secret<String>) -> Self {
        if token.is_empty() {
            warn!("🔐️ No admin token is configured. The admin routes will refuse every request.");
        }
        AdminAuthMiddlewareFactory { token }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminAuthMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AdminAuthMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminAuthMiddlewareService { token: self.token.clone(), service: Rc::new(service) }))
    }
}

pub struct AdminAuthMiddlewareService<S> {
    token: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let authorized = is_authorized(&req, &self.token);
        Box::pin(async move {
            if authorized {
                trace!("🔐️ Admin token for {} ✅️", req.path());
                service.call(req).await
            } else {
                warn!("🔐️ Unauthorized admin request to {} from {:?}", req.path(), req.peer_addr());
                Err(ServerError::Unauthorized("A valid admin token is required".into()).into())
            }
        })
    }
}

fn is_authorized(req: &ServiceRequest, token: &Secret<String>) -> bool {
    if token.is_empty() {
        return false;
    }
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|supplied| constant_time_eq(supplied.trim().as_bytes(), token.reveal().as_bytes()))
}
