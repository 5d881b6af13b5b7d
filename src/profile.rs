//! Profile resolution.
//!
//! A profile selects which capability groups a run applies. Broader profiles
//! extend narrower ones by appending, never by reordering.

use crate::catalog;
use crate::rule::RuleGroup;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Shader model, wave ops, resource binding, shader ops.
    #[default]
    Base,
    /// `Base` plus mesh shading, ray tracing, sampler feedback, texture ops.
    Extended,
    /// `Extended` plus rendering feature flags.
    Full,
}

impl Profile {
    pub const ALL: [Profile; 3] = [Profile::Base, Profile::Extended, Profile::Full];

    /// Resolve a profile name.
    ///
    /// Accepts `base`/`extended`/`full` and the legacy `p3`/`p7`/`p9`,
    /// ignoring case and surrounding whitespace. Anything else resolves to
    /// [`Profile::Base`].
    pub fn resolve(name: &str) -> Self {
        match Self::from_name(name) {
            Some(profile) => profile,
            None => {
                tracing::debug!(name, "unrecognized profile, using base");
                Profile::Base
            }
        }
    }

    /// Strict lookup used by [`Profile::resolve`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "base" | "p3" => Some(Profile::Base),
            "extended" | "p7" => Some(Profile::Extended),
            "full" | "p9" => Some(Profile::Full),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Profile::Base => "base",
            Profile::Extended => "extended",
            Profile::Full => "full",
        }
    }

    /// Capability groups for this profile, in application order.
    pub fn groups(self) -> Vec<RuleGroup> {
        let mut groups = vec![
            catalog::shader_model(),
            catalog::wave_ops(),
            catalog::resource_binding(),
            catalog::shader_ops(),
        ];
        if self == Profile::Base {
            return groups;
        }

        groups.extend([
            catalog::mesh_shading(),
            catalog::ray_tracing(),
            catalog::sampler_feedback(),
            catalog::texture_ops(),
        ]);
        if self == Profile::Extended {
            return groups;
        }

        groups.push(catalog::rendering_features());
        groups
    }

    /// Category names of [`Profile::groups`].
    pub fn categories(self) -> Vec<&'static str> {
        self.groups().iter().map(RuleGroup::category).collect()
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&str> for Profile {
    fn from(name: &str) -> Self {
        Profile::resolve(name)
    }
}
