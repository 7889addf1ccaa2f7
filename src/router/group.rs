//! Registration helpers: domain binders, prefix groups and controllers.
//!
//! These are conveniences over [`Router::register_serve`] and [`Router::register_hook`]; every
//! route they create is an ordinary registration with the same precedence rules.
//!
//! ```rust
//! use hookrouter::dispatcher::{DispatchSignal, HandlerRequest, HandlerResult};
//! use hookrouter::router::Router;
//! use http::Method;
//!
//! fn ok(_: &mut HandlerRequest) -> HandlerResult {
//!     Ok(DispatchSignal::Continue)
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut router = Router::default();
//! router.group("/api", |api| {
//!     api.get("/users", ok)?.post("/users", ok)?;
//!     api.group("/v2", |v2| {
//!         v2.all("/ping", ok)?;
//!         Ok(())
//!     })
//! })?;
//! router.domain("a.com, b.com").register_serve("/home", ok)?;
//! router.start()?;
//!
//! assert!(router.resolve_serve("x.org", &Method::POST, "/api/users").is_some());
//! assert!(router.resolve_serve("x.org", &Method::PUT, "/api/users").is_none());
//! assert!(router.resolve_serve("x.org", &Method::PUT, "/api/v2/ping").is_some());
//! assert!(router.resolve_serve("b.com", &Method::GET, "/home").is_some());
//! assert!(router.resolve_serve("x.org", &Method::GET, "/home").is_none());
//! # Ok(())
//! # }
//! ```

use http::Method;
use std::sync::Arc;

use super::core::Router;
use super::error::RegistrationError;
use crate::dispatcher::{HandlerRequest, HandlerResult, SharedHandler};
use crate::hooks::HookStage;
use crate::pattern::{MethodFilter, Pattern, SUPPORTED_METHODS};

/// A type exposing named actions, bound under a common pattern.
///
/// With [`Router::register_controller`] each action is registered at `<pattern>/<action>` and an
/// action named `index` is also bound to the bare pattern. With
/// [`Router::register_controller_rest`] only actions named after an HTTP verb (`get`, `Delete`,
/// ...) are bound, each to the bare pattern for that verb alone.
///
/// ```rust
/// use hookrouter::dispatcher::{DispatchSignal, HandlerRequest, HandlerResult, SharedHandler};
/// use hookrouter::router::{Controller, Router};
/// use std::sync::Arc;
///
/// struct Users {
///     greeting: Arc<str>,
/// }
///
/// impl Controller for Users {
///     fn actions(&self) -> Vec<(&'static str, SharedHandler)> {
///         let greeting = Arc::clone(&self.greeting);
///         vec![(
///             "index",
///             Arc::new(move |req: &mut HandlerRequest| -> HandlerResult {
///                 req.response.write(&*greeting);
///                 Ok(DispatchSignal::Continue)
///             }),
///         )]
///     }
/// }
///
/// let mut router = Router::default();
/// router
///     .register_controller("/users", &Users { greeting: Arc::from("hi") })
///     .unwrap();
/// assert_eq!(router.len(), 2);
/// ```
pub trait Controller {
    /// `(action, handler)` pairs to register.
    fn actions(&self) -> Vec<(&'static str, SharedHandler)>;
}

impl Router {
    /// Binder registering every pattern under each domain of a comma-separated list.
    #[must_use]
    pub fn domain(&mut self, domains: &str) -> DomainBinder<'_> {
        DomainBinder {
            router: self,
            domains: split_domains(domains),
        }
    }

    /// Register routes under a common URI prefix.
    pub fn group<F>(&mut self, prefix: &str, build: F) -> Result<(), RegistrationError>
    where
        F: FnOnce(&mut RouterGroup<'_>) -> Result<(), RegistrationError>,
    {
        let mut group = RouterGroup {
            router: self,
            prefix: join_prefix("", prefix),
            domains: Vec::new(),
        };
        build(&mut group)
    }

    /// Register every action of a controller under `pattern`.
    pub fn register_controller<C>(
        &mut self,
        pattern: &str,
        controller: &C,
    ) -> Result<(), RegistrationError>
    where
        C: Controller + ?Sized,
    {
        self.ensure_stopped(pattern)?;
        let base = Pattern::parse(pattern)?;
        bind_controller(self, &base, &[], controller)
    }

    /// Register the verb-named actions of a controller on `pattern`, one method each.
    ///
    /// Actions whose name is not one of the nine supported verbs are skipped.
    pub fn register_controller_rest<C>(
        &mut self,
        pattern: &str,
        controller: &C,
    ) -> Result<(), RegistrationError>
    where
        C: Controller + ?Sized,
    {
        self.ensure_stopped(pattern)?;
        let base = Pattern::parse(pattern)?;
        bind_controller_rest(self, &base, &[], controller)
    }

    /// Register a single action of a controller on `pattern`, which keeps its own `METHOD:` and
    /// `@domain` parts.
    ///
    /// # Errors
    ///
    /// [`RegistrationError::UnknownAction`] if the controller has no such action.
    pub fn register_controller_action<C>(
        &mut self,
        pattern: &str,
        controller: &C,
        action: &str,
    ) -> Result<(), RegistrationError>
    where
        C: Controller + ?Sized,
    {
        self.ensure_stopped(pattern)?;
        let parsed = Pattern::parse(pattern)?;
        let type_name = std::any::type_name::<C>();
        let handler = controller
            .actions()
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(action))
            .map(|(_, handler)| handler)
            .ok_or_else(|| RegistrationError::UnknownAction {
                controller: type_name.to_string(),
                action: action.to_string(),
            })?;
        let name = format!("{type_name}::{action}");
        bind_each(self, &parsed, &[], None, handler, &name)
    }
}

/// Registers patterns under a fixed set of domains, ignoring any `@domain` in the pattern.
pub struct DomainBinder<'r> {
    router: &'r mut Router,
    domains: Vec<String>,
}

impl DomainBinder<'_> {
    /// Domains this binder registers under.
    #[must_use]
    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// Register a serve handler under every domain.
    pub fn register_serve<F>(&mut self, pattern: &str, handler: F) -> Result<(), RegistrationError>
    where
        F: Fn(&mut HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        let parsed = Pattern::parse(pattern)?;
        bind_each(
            self.router,
            &parsed,
            &self.domains,
            None,
            Arc::new(handler),
            std::any::type_name::<F>(),
        )
    }

    /// Register a hook under every domain.
    pub fn register_hook<F>(
        &mut self,
        pattern: &str,
        stage: &str,
        handler: F,
    ) -> Result<(), RegistrationError>
    where
        F: Fn(&mut HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        let stage: HookStage = stage.parse()?;
        let parsed = Pattern::parse(pattern)?;
        bind_each(
            self.router,
            &parsed,
            &self.domains,
            Some(stage),
            Arc::new(handler),
            std::any::type_name::<F>(),
        )
    }

    /// Register every action of a controller under every domain.
    pub fn register_controller<C>(
        &mut self,
        pattern: &str,
        controller: &C,
    ) -> Result<(), RegistrationError>
    where
        C: Controller + ?Sized,
    {
        let base = Pattern::parse(pattern)?;
        bind_controller(self.router, &base, &self.domains, controller)
    }

    /// Register the verb-named actions of a controller under every domain.
    pub fn register_controller_rest<C>(
        &mut self,
        pattern: &str,
        controller: &C,
    ) -> Result<(), RegistrationError>
    where
        C: Controller + ?Sized,
    {
        let base = Pattern::parse(pattern)?;
        bind_controller_rest(self.router, &base, &self.domains, controller)
    }

    /// Prefix group whose routes land under every domain of this binder.
    pub fn group<F>(&mut self, prefix: &str, build: F) -> Result<(), RegistrationError>
    where
        F: FnOnce(&mut RouterGroup<'_>) -> Result<(), RegistrationError>,
    {
        let mut group = RouterGroup {
            router: &mut *self.router,
            prefix: join_prefix("", prefix),
            domains: self.domains.clone(),
        };
        build(&mut group)
    }
}

/// Registers patterns below a URI prefix. Created by [`Router::group`].
pub struct RouterGroup<'r> {
    router: &'r mut Router,
    prefix: String,
    domains: Vec<String>,
}

macro_rules! method_helpers {
    ($($(#[$doc:meta])* $name:ident => $method:expr;)*) => {
        $(
            $(#[$doc])*
            pub fn $name<F>(&mut self, uri: &str, handler: F) -> Result<&mut Self, RegistrationError>
            where
                F: Fn(&mut HandlerRequest) -> HandlerResult + Send + Sync + 'static,
            {
                self.bind_method(uri, MethodFilter::Only($method), handler)
            }
        )*
    };
}

impl RouterGroup<'_> {
    /// Full prefix of this group.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Nested group below this one.
    pub fn group<F>(&mut self, prefix: &str, build: F) -> Result<(), RegistrationError>
    where
        F: FnOnce(&mut RouterGroup<'_>) -> Result<(), RegistrationError>,
    {
        let mut group = RouterGroup {
            router: &mut *self.router,
            prefix: join_prefix(&self.prefix, prefix),
            domains: self.domains.clone(),
        };
        build(&mut group)
    }

    /// Register a serve handler; the pattern keeps its own `METHOD:` and `@domain` parts.
    pub fn bind<F>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(&mut HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        let parsed = self.parse(pattern)?;
        bind_each(
            self.router,
            &parsed,
            &self.domains,
            None,
            Arc::new(handler),
            std::any::type_name::<F>(),
        )?;
        Ok(self)
    }

    /// Register a serve handler for every method.
    pub fn all<F>(&mut self, uri: &str, handler: F) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(&mut HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.bind_method(uri, MethodFilter::All, handler)
    }

    method_helpers! {
        /// Register a `GET` handler.
        get => Method::GET;
        /// Register a `PUT` handler.
        put => Method::PUT;
        /// Register a `POST` handler.
        post => Method::POST;
        /// Register a `DELETE` handler.
        delete => Method::DELETE;
        /// Register a `PATCH` handler.
        patch => Method::PATCH;
        /// Register a `HEAD` handler.
        head => Method::HEAD;
        /// Register a `CONNECT` handler.
        connect => Method::CONNECT;
        /// Register an `OPTIONS` handler.
        options => Method::OPTIONS;
        /// Register a `TRACE` handler.
        trace => Method::TRACE;
    }

    /// Register a hook below the prefix.
    pub fn hook<F>(
        &mut self,
        pattern: &str,
        stage: &str,
        handler: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(&mut HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        let stage: HookStage = stage.parse()?;
        let parsed = self.parse(pattern)?;
        bind_each(
            self.router,
            &parsed,
            &self.domains,
            Some(stage),
            Arc::new(handler),
            std::any::type_name::<F>(),
        )?;
        Ok(self)
    }

    /// Register every action of a controller below the prefix.
    pub fn controller<C>(
        &mut self,
        pattern: &str,
        controller: &C,
    ) -> Result<&mut Self, RegistrationError>
    where
        C: Controller + ?Sized,
    {
        let base = self.parse(pattern)?;
        bind_controller(self.router, &base, &self.domains, controller)?;
        Ok(self)
    }

    /// Register the verb-named actions of a controller below the prefix.
    pub fn rest_controller<C>(
        &mut self,
        pattern: &str,
        controller: &C,
    ) -> Result<&mut Self, RegistrationError>
    where
        C: Controller + ?Sized,
    {
        let base = self.parse(pattern)?;
        bind_controller_rest(self.router, &base, &self.domains, controller)?;
        Ok(self)
    }

    fn parse(&self, pattern: &str) -> Result<Pattern, RegistrationError> {
        self.router.ensure_stopped(pattern)?;
        Ok(Pattern::parse(pattern)?.with_prefix(&self.prefix))
    }

    fn bind_method<F>(
        &mut self,
        uri: &str,
        method: MethodFilter,
        handler: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(&mut HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        let parsed = self.parse(uri)?.with_method(method);
        bind_each(
            self.router,
            &parsed,
            &self.domains,
            None,
            Arc::new(handler),
            std::any::type_name::<F>(),
        )?;
        Ok(self)
    }
}

/// Bind one handler under each domain, or under the pattern's own domain when `domains` is
/// empty.
fn bind_each(
    router: &mut Router,
    pattern: &Pattern,
    domains: &[String],
    stage: Option<HookStage>,
    handler: SharedHandler,
    name: &str,
) -> Result<(), RegistrationError> {
    if domains.is_empty() {
        router.bind_parsed(pattern.clone(), stage, handler, name)?;
        return Ok(());
    }
    for domain in domains {
        router.bind_parsed(pattern.with_domain(domain), stage, Arc::clone(&handler), name)?;
    }
    Ok(())
}

fn bind_controller<C>(
    router: &mut Router,
    base: &Pattern,
    domains: &[String],
    controller: &C,
) -> Result<(), RegistrationError>
where
    C: Controller + ?Sized,
{
    let type_name = std::any::type_name::<C>();
    for (action, handler) in controller.actions() {
        let name = format!("{type_name}::{action}");
        let action_pattern = base.with_action(action);
        bind_each(router, &action_pattern, domains, None, Arc::clone(&handler), &name)?;
        if action.eq_ignore_ascii_case("index") {
            bind_each(router, base, domains, None, handler, &name)?;
        }
    }
    Ok(())
}

fn bind_controller_rest<C>(
    router: &mut Router,
    base: &Pattern,
    domains: &[String],
    controller: &C,
) -> Result<(), RegistrationError>
where
    C: Controller + ?Sized,
{
    let type_name = std::any::type_name::<C>();
    for (action, handler) in controller.actions() {
        let Some(verb) = action_verb(action) else {
            tracing::debug!(controller = type_name, action, "skipping non-verb action");
            continue;
        };
        let name = format!("{type_name}::{action}");
        let verb_pattern = base.with_method(MethodFilter::Only(verb));
        bind_each(router, &verb_pattern, domains, None, handler, &name)?;
    }
    Ok(())
}

/// The supported verb an action is named after, case-insensitively.
fn action_verb(action: &str) -> Option<Method> {
    SUPPORTED_METHODS
        .iter()
        .find(|m| m.as_str().eq_ignore_ascii_case(action))
        .cloned()
}

fn split_domains(domains: &str) -> Vec<String> {
    domains
        .split(',')
        .map(|d| d.trim().to_ascii_lowercase())
        .filter(|d| !d.is_empty())
        .collect()
}

fn join_prefix(parent: &str, prefix: &str) -> String {
    let prefix = prefix.trim().trim_matches('/');
    let parent = parent.trim_end_matches('/');
    if prefix.is_empty() {
        parent.to_string()
    } else {
        format!("{parent}/{prefix}")
    }
}
