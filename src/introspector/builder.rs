use std::{
    collections::HashMap,
    hash::{Hash, Hasher},
    sync::{Arc, LazyLock, Weak},
};

use parking_lot::Mutex;
use tracing::debug;

use crate::{
    access_policy::{DefaultMemberAccessPolicy, MemberAccessPolicy},
    introspector::{ClassIntrospector, MethodAppearanceFineTuner},
};

/// How much of a class is exposed, from the most to the least.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum ExposureLevel {
    /// Everything, ignoring the member access policy.
    All,
    /// What the member access policy allows.
    #[default]
    Safe,
    /// Properties (and fields, if those are exposed), but no plain methods.
    PropertiesOnly,
    /// Neither properties nor methods.
    Nothing,
}

// canonical shared introspectors by their settings
static SHARED_INSTANCES: LazyLock<Mutex<HashMap<ClassIntrospectorBuilder, Weak<ClassIntrospector>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Settings of a [`ClassIntrospector`]. Builders with equal settings are equal, and
/// [`ClassIntrospectorBuilder::build`] hands out one introspector for them.
#[derive(Clone)]
pub struct ClassIntrospectorBuilder {
    exposure_level: ExposureLevel,
    expose_fields: bool,
    member_access_policy: Arc<dyn MemberAccessPolicy>,
    method_appearance_fine_tuner: Option<Arc<dyn MethodAppearanceFineTuner>>,
}

impl Default for ClassIntrospectorBuilder {
    fn default() -> Self {
        ClassIntrospectorBuilder {
            exposure_level: ExposureLevel::default(),
            expose_fields: false,
            member_access_policy: DefaultMemberAccessPolicy::instance(),
            method_appearance_fine_tuner: None,
        }
    }
}

impl ClassIntrospectorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exposure_level(mut self, exposure_level: ExposureLevel) -> Self {
        self.exposure_level = exposure_level;
        self
    }

    /// Expose public instance fields too.
    pub fn expose_fields(mut self, expose_fields: bool) -> Self {
        self.expose_fields = expose_fields;
        self
    }

    pub fn member_access_policy(mut self, policy: Arc<dyn MemberAccessPolicy>) -> Self {
        self.member_access_policy = policy;
        self
    }

    pub fn method_appearance_fine_tuner(
        mut self,
        fine_tuner: Option<Arc<dyn MethodAppearanceFineTuner>>,
    ) -> Self {
        self.method_appearance_fine_tuner = fine_tuner;
        self
    }

    pub fn get_exposure_level(&self) -> ExposureLevel {
        self.exposure_level
    }

    pub fn get_expose_fields(&self) -> bool {
        self.expose_fields
    }

    pub fn get_member_access_policy(&self) -> &Arc<dyn MemberAccessPolicy> {
        &self.member_access_policy
    }

    pub fn get_method_appearance_fine_tuner(&self) -> Option<&Arc<dyn MethodAppearanceFineTuner>> {
        self.method_appearance_fine_tuner.as_ref()
    }

    fn is_shareable(&self) -> bool {
        self.method_appearance_fine_tuner
            .as_ref()
            .is_none_or(|fine_tuner| fine_tuner.is_shareable())
    }

    /// Returns the process-wide introspector for these settings, creating it if no live one
    /// exists. The returned instance refuses [`ClassIntrospector::clear_cache`].
    pub fn build(self) -> Arc<ClassIntrospector> {
        if !self.is_shareable() {
            return Arc::new(ClassIntrospector::new(self, true, false));
        }
        let mut instances = SHARED_INSTANCES.lock();
        if let Some(existing) = instances.get(&self).and_then(Weak::upgrade) {
            return existing;
        }
        instances.retain(|_, instance| instance.strong_count() > 0);
        let introspector = Arc::new(ClassIntrospector::new(self.clone(), true, true));
        instances.insert(self, Arc::downgrade(&introspector));
        debug!(shared_instances = instances.len(), "created shared class introspector");
        introspector
    }

    /// Returns a new introspector that isn't shared with anything.
    pub fn build_private(self) -> Arc<ClassIntrospector> {
        Arc::new(ClassIntrospector::new(self, false, false))
    }
}

fn thin_ptr<T: ?Sized>(arc: &Arc<T>) -> *const () {
    Arc::as_ptr(arc) as *const ()
}

impl PartialEq for ClassIntrospectorBuilder {
    fn eq(&self, other: &Self) -> bool {
        self.exposure_level == other.exposure_level
            && self.expose_fields == other.expose_fields
            && thin_ptr(&self.member_access_policy) == thin_ptr(&other.member_access_policy)
            && self.method_appearance_fine_tuner.as_ref().map(thin_ptr)
                == other.method_appearance_fine_tuner.as_ref().map(thin_ptr)
    }
}

impl Eq for ClassIntrospectorBuilder {}

impl Hash for ClassIntrospectorBuilder {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.exposure_level.hash(state);
        self.expose_fields.hash(state);
        thin_ptr(&self.member_access_policy).hash(state);
        self.method_appearance_fine_tuner.as_ref().map(thin_ptr).hash(state);
    }
}

impl std::fmt::Debug for ClassIntrospectorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassIntrospectorBuilder")
            .field("exposure_level", &self.exposure_level)
            .field("expose_fields", &self.expose_fields)
            .field("member_access_policy", &thin_ptr(&self.member_access_policy))
            .field(
                "method_appearance_fine_tuner",
                &self.method_appearance_fine_tuner.as_ref().map(thin_ptr),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access_policy::AllowAllMemberAccessPolicy;
    use pretty_assertions::assert_eq;

    #[test]
    fn equal_settings_share_one_introspector() {
        let a = ClassIntrospectorBuilder::new().expose_fields(true).build();
        let b = ClassIntrospectorBuilder::new().expose_fields(true).build();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.is_shared());

        let other = ClassIntrospectorBuilder::new().expose_fields(true).exposure_level(ExposureLevel::All).build();
        assert!(!Arc::ptr_eq(&a, &other));

        let private = ClassIntrospectorBuilder::new().expose_fields(true).build_private();
        assert!(!Arc::ptr_eq(&a, &private));
        assert!(!private.is_shared());
    }

    #[test]
    fn policies_compare_by_identity() {
        let policy: Arc<dyn MemberAccessPolicy> = Arc::new(AllowAllMemberAccessPolicy);
        let with_policy = || ClassIntrospectorBuilder::new().member_access_policy(Arc::clone(&policy));
        assert_eq!(with_policy(), with_policy());
        assert!(
            with_policy()
                != ClassIntrospectorBuilder::new()
                    .member_access_policy(Arc::new(AllowAllMemberAccessPolicy))
        );
        assert_eq!(ClassIntrospectorBuilder::new(), ClassIntrospectorBuilder::default());
    }
}
