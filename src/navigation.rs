//! Typed navigation stack. Routes are a closed enum with their parameters
//! baked in; the top of the stack is the active screen.

use crate::config::Environment;

/// How the user wants to provide the wallet seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedType {
    Mnemonic,
    Hex,
    RandomHex,
}

impl SeedType {
    pub fn label(&self) -> &'static str {
        match self {
            SeedType::Mnemonic => "24-word mnemonic",
            SeedType::Hex => "64-character hex seed",
            SeedType::RandomHex => "generate a random seed",
        }
    }
}

/// One entry in the navigation stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Environment,
    SeedType {
        environment: Environment,
    },
    Seed {
        environment: Environment,
        seed_type: SeedType,
    },
    Initializing {
        environment: Environment,
        seed_type: SeedType,
    },
    Dashboard {
        environment: Environment,
    },
    Transfer {
        environment: Environment,
    },
    RegisterDust {
        environment: Environment,
    },
    DeregisterDust {
        environment: Environment,
    },
    Settings {
        environment: Environment,
    },
}

/// An ordered stack of routes, never empty; the top is the current screen.
pub struct Navigator {
    stack: Vec<Route>,
}

impl Navigator {
    pub fn new(initial: Route) -> Navigator {
        Navigator {
            stack: vec![initial],
        }
    }

    /// The active route.
    pub fn current(&self) -> &Route {
        self.stack.last().expect("navigation stack is never empty")
    }

    /// Append a new route on top. The same screen may be pushed more than
    /// once.
    pub fn push(&mut self, route: Route) {
        self.stack.push(route);
    }

    /// Swap the top route for another without growing the stack. Used when
    /// the screen being left should not remain reachable via back.
    pub fn replace(&mut self, route: Route) {
        self.stack.pop();
        self.stack.push(route);
    }

    /// Remove the top route. A no-op on a single-entry stack; the root
    /// screen can never be popped.
    pub fn pop(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    /// Throw away all history and make `route` the only entry.
    pub fn reset(&mut self, route: Route) {
        self.stack.clear();
        self.stack.push(route);
    }

    pub fn can_go_back(&self) -> bool {
        self.stack.len() > 1
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Environment {
        Environment::Undeployed
    }

    #[test]
    fn starts_with_one_route_and_cannot_go_back() {
        let nav = Navigator::new(Route::Environment);
        assert_eq!(nav.depth(), 1);
        assert!(!nav.can_go_back());
        assert_eq!(*nav.current(), Route::Environment);
    }

    #[test]
    fn push_grows_and_pop_shrinks() {
        let mut nav = Navigator::new(Route::Environment);
        nav.push(Route::SeedType { environment: env() });
        assert_eq!(nav.depth(), 2);
        assert!(nav.can_go_back());

        nav.pop();
        assert_eq!(nav.depth(), 1);
        assert_eq!(*nav.current(), Route::Environment);
    }

    #[test]
    fn pop_on_root_is_a_no_op() {
        let mut nav = Navigator::new(Route::Environment);
        nav.pop();
        nav.pop();
        assert_eq!(nav.depth(), 1);
        assert_eq!(*nav.current(), Route::Environment);
    }

    #[test]
    fn replace_never_changes_stack_length() {
        let mut nav = Navigator::new(Route::Environment);
        nav.push(Route::Seed {
            environment: env(),
            seed_type: SeedType::Hex,
        });
        let before = nav.depth();

        nav.replace(Route::Initializing {
            environment: env(),
            seed_type: SeedType::Hex,
        });
        assert_eq!(nav.depth(), before);
        assert!(matches!(nav.current(), Route::Initializing { .. }));

        // The replaced screen is gone from history.
        nav.pop();
        assert_eq!(*nav.current(), Route::Environment);
    }

    #[test]
    fn reset_collapses_to_a_single_route() {
        let mut nav = Navigator::new(Route::Environment);
        nav.push(Route::SeedType { environment: env() });
        nav.push(Route::Seed {
            environment: env(),
            seed_type: SeedType::Mnemonic,
        });

        nav.reset(Route::Dashboard { environment: env() });
        assert_eq!(nav.depth(), 1);
        assert!(!nav.can_go_back());
        assert!(matches!(nav.current(), Route::Dashboard { .. }));
    }

    #[test]
    fn duplicate_routes_are_allowed() {
        let mut nav = Navigator::new(Route::Dashboard { environment: env() });
        nav.push(Route::Transfer { environment: env() });
        nav.push(Route::Transfer { environment: env() });
        assert_eq!(nav.depth(), 3);
    }

    #[test]
    fn stack_length_is_always_at_least_one() {
        let mut nav = Navigator::new(Route::Environment);
        for _ in 0..8 {
            nav.push(Route::SeedType { environment: env() });
        }
        for _ in 0..32 {
            nav.pop();
        }
        assert_eq!(nav.depth(), 1);
    }
}
