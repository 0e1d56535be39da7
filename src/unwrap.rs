use std::{collections::HashMap, sync::Arc};

use tracing::debug;

use crate::{
    error::{Error, HostError, HostResult, Result},
    model::{self, ModelRef},
    overload::{TypeFlags, force_unwrapped_number_to_type},
    runtime::{
        Class, CollectionAccess, HostArray, HostValue, JType, ListAccess, MapAccess,
        famous_classes, inheritance,
    },
};

/// Arrays under construction, keyed by the identity of the sequence they are built from.
type RecursionStops = HashMap<usize, HostArray>;

/// Result of unwrapping for overload selection: a one-character string at a position that
/// accepts both characters and strings stays undecided until a member is chosen.
#[derive(Debug, Clone)]
pub(crate) struct Unwrapped {
    pub(crate) value: HostValue,
    pub(crate) character_or_string: bool,
}

impl Unwrapped {
    fn value(value: HostValue) -> Self {
        Unwrapped {
            value,
            character_or_string: false,
        }
    }
}

enum Attempt {
    Done(HostValue),
    Fail,
    Continue,
}

/// Unwraps to the natural host value of the model.
pub fn unwrap(model: Option<&ModelRef>) -> Result<HostValue> {
    let object = JType::class(famous_classes::object_class());
    try_unwrap_to(model, &object, TypeFlags::empty())?.ok_or_else(|| cannot_unwrap(model, &object))
}

/// Unwraps to a value assignable to `target`, failing with a diagnostic if that's not possible.
pub fn unwrap_to(model: Option<&ModelRef>, target: &JType) -> Result<HostValue> {
    if let Some(value) = try_unwrap_to(model, target, TypeFlags::empty())? {
        return Ok(value);
    }
    if let Some(sequence) = model {
        if target.is_array() && sequence.as_sequence().is_some() {
            // reports the offending item
            unwrap_sequence_to_array(sequence, target, false, &mut RecursionStops::new())?;
        }
    }
    Err(cannot_unwrap(model, target))
}

/// Unwraps to a value assignable to `target`; `Ok(None)` means the model can't be converted.
///
/// Non-empty `flags` restrict the kinds of values the model may be unwrapped to when `target`
/// alone doesn't decide; if no allowed kind fits, unrestricted unwrapping is tried.
pub fn try_unwrap_to(
    model: Option<&ModelRef>,
    target: &JType,
    flags: TypeFlags,
) -> Result<Option<HostValue>> {
    Ok(try_unwrap(model, target, flags, &mut RecursionStops::new())?.map(|u| u.value))
}

pub(crate) fn try_unwrap_for_overload(
    model: Option<&ModelRef>,
    target: &JType,
    flags: TypeFlags,
) -> Result<Option<Unwrapped>> {
    try_unwrap(model, target, flags, &mut RecursionStops::new())
}

fn try_unwrap(
    model: Option<&ModelRef>,
    target: &JType,
    flags: TypeFlags,
    stops: &mut RecursionStops,
) -> Result<Option<Unwrapped>> {
    let Some(model) = model else {
        return Ok(Some(Unwrapped::value(HostValue::Null)));
    };
    let target = target.boxed();

    if let Some(adapter) = model.as_adapter() {
        if let Some(value) = pass_through(adapter.adapted_object(&target), &target) {
            return Ok(Some(Unwrapped::value(value)));
        }
    }
    if let Some(wrapper) = model.as_wrapper() {
        if let Some(value) = pass_through(wrapper.wrapped_object(), &target) {
            return Ok(Some(Unwrapped::value(value)));
        }
    }

    if !target.is_object() {
        match unwrap_for_target(model, &target, stops)? {
            Attempt::Done(value) => return Ok(Some(Unwrapped::value(value))),
            Attempt::Fail => return Ok(None),
            Attempt::Continue => {}
        }
    }

    let mut iteration_flags = flags;
    loop {
        if let Some(unwrapped) = unwrap_by_capability(model, &target, iteration_flags)? {
            return Ok(Some(unwrapped));
        }
        if iteration_flags.is_empty() {
            break;
        }
        iteration_flags = TypeFlags::empty();
    }
    Ok(None)
}

/// The adapted or wrapped host value, if it already fits the target.
fn pass_through(value: HostValue, target: &JType) -> Option<HostValue> {
    if target.is_object() || inheritance::is_instance(target, &value) {
        return Some(value);
    }
    match &value {
        HostValue::Number(number) if target.is_numerical() => {
            force_unwrapped_number_to_type(number, target).map(HostValue::Number)
        }
        _ => None,
    }
}

/// Conversions decided by the target type alone. Final targets fail right away if their single
/// conversion doesn't apply.
fn unwrap_for_target(model: &ModelRef, target: &JType, stops: &mut RecursionStops) -> Result<Attempt> {
    let is = |class: &Arc<Class>| target.is_class(class);

    if is(famous_classes::string_class()) {
        return Ok(match model.as_scalar() {
            Some(scalar) => Attempt::Done(HostValue::String(scalar.get_as_string()?)),
            None => Attempt::Fail,
        });
    }
    if target.is_numerical() {
        if let Some(number) = model.as_number() {
            if let Some(forced) = force_unwrapped_number_to_type(&number.get_as_number()?, target) {
                return Ok(Attempt::Done(HostValue::Number(forced)));
            }
        }
    }
    if is(famous_classes::boolean_class()) {
        return Ok(match model.as_boolean() {
            Some(boolean) => Attempt::Done(HostValue::Boolean(boolean.get_as_boolean()?)),
            None => Attempt::Fail,
        });
    }
    if is(famous_classes::map_class()) && model.as_hash().is_some() {
        return Ok(Attempt::Done(HashAdapter::host_value(model)));
    }
    if is(famous_classes::list_class()) && model.as_sequence().is_some() {
        return Ok(Attempt::Done(SequenceAdapter::host_value(model)));
    }
    if is(famous_classes::set_class()) && model.as_collection().is_some() {
        return Ok(Attempt::Done(SetAdapter::host_value(model)));
    }
    if is(famous_classes::collection_class()) || is(famous_classes::iterable_class()) {
        if model.as_collection().is_some() {
            return Ok(Attempt::Done(CollectionAdapter::host_value(model)));
        }
        if model.as_sequence().is_some() {
            return Ok(Attempt::Done(SequenceAdapter::host_value(model)));
        }
    }
    if target.is_array() {
        if model.as_sequence().is_none() {
            return Ok(Attempt::Fail);
        }
        return Ok(match unwrap_sequence_to_array(model, target, true, stops)? {
            Some(array) => Attempt::Done(array),
            None => Attempt::Fail,
        });
    }
    if is(famous_classes::character_class()) {
        if let Some(scalar) = model.as_scalar() {
            let text = scalar.get_as_string()?;
            let mut chars = text.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                return Ok(Attempt::Done(HostValue::Char(c)));
            }
        }
        return Ok(Attempt::Fail);
    }
    let date = JType::class(famous_classes::date_class());
    if inheritance::is_assignable_from(&date, target) {
        if let Some(date_model) = model.as_date() {
            let value = HostValue::Date(date_model.get_as_date()?);
            if inheritance::is_instance(target, &value) {
                return Ok(Attempt::Done(value));
            }
        }
    }
    Ok(Attempt::Continue)
}

/// Unwraps to the natural host value of the first capability, in a fixed order, that `flags`
/// accepts. With empty flags the result must fit `target` instead.
fn unwrap_by_capability(
    model: &ModelRef,
    target: &JType,
    flags: TypeFlags,
) -> Result<Option<Unwrapped>> {
    let flagged = !flags.is_empty();
    let accepts = |flag: TypeFlags| !flagged || flags.intersects(flag);
    let target_accepts = |class: &Arc<Class>| {
        flagged || inheritance::is_assignable_from(target, &JType::class(class))
    };
    let done = |value: HostValue| -> Result<Option<Unwrapped>> {
        Ok(Some(Unwrapped::value(value)))
    };

    if accepts(TypeFlags::ACCEPTS_NUMBER) {
        if let Some(number) = model.as_number() {
            let value = HostValue::Number(number.get_as_number()?);
            if flagged || inheritance::is_instance(target, &value) {
                return done(value);
            }
        }
    }
    if accepts(TypeFlags::ACCEPTS_DATE) {
        if let Some(date) = model.as_date() {
            let value = HostValue::Date(date.get_as_date()?);
            if flagged || inheritance::is_instance(target, &value) {
                return done(value);
            }
        }
    }
    if accepts(TypeFlags::ACCEPTS_STRING | TypeFlags::CHARACTER)
        && target_accepts(famous_classes::string_class())
    {
        if let Some(scalar) = model.as_scalar() {
            let text = scalar.get_as_string()?;
            let accepts_string = flags.contains(TypeFlags::ACCEPTS_STRING);
            if !flags.contains(TypeFlags::CHARACTER) {
                return done(HostValue::String(text));
            }
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(_), None) if accepts_string => {
                    return Ok(Some(Unwrapped {
                        value: HostValue::String(text),
                        character_or_string: true,
                    }));
                }
                (Some(c), None) => return done(HostValue::Char(c)),
                _ if accepts_string => return done(HostValue::String(text)),
                _ => {}
            }
        }
    }
    if accepts(TypeFlags::ACCEPTS_BOOLEAN) && target_accepts(famous_classes::boolean_class()) {
        if let Some(boolean) = model.as_boolean() {
            return done(HostValue::Boolean(boolean.get_as_boolean()?));
        }
    }
    if accepts(TypeFlags::ACCEPTS_MAP)
        && model.as_hash().is_some()
        && target_accepts(famous_classes::hash_map_class())
    {
        return done(HashAdapter::host_value(model));
    }
    if accepts(TypeFlags::ACCEPTS_LIST)
        && model.as_sequence().is_some()
        && target_accepts(famous_classes::array_list_class())
    {
        return done(SequenceAdapter::host_value(model));
    }
    if accepts(TypeFlags::ACCEPTS_SET)
        && model.as_collection().is_some()
        && target_accepts(famous_classes::hash_set_class())
    {
        return done(SetAdapter::host_value(model));
    }
    // lists convert to arrays when the overloaded member is invoked
    if flags.contains(TypeFlags::ACCEPTS_ARRAY) && model.as_sequence().is_some() {
        return done(SequenceAdapter::host_value(model));
    }
    Ok(None)
}

/// Builds a host array from a sequence, unwrapping each item to the component type. A sequence
/// that (directly or indirectly) contains itself gets the array that is being built for it.
///
/// A sequence that shrinks while it is read gives an array of the items that were still there.
///
/// With `try_only` an item that can't be converted gives `Ok(None)`, otherwise an error naming
/// the item.
pub(crate) fn unwrap_sequence_to_array(
    sequence: &ModelRef,
    array_type: &JType,
    try_only: bool,
    stops: &mut HashMap<usize, HostArray>,
) -> Result<Option<HostValue>> {
    let identity = model::model_identity(sequence);
    if let Some(array) = stops.get(&identity) {
        return Ok(Some(HostValue::Array(array.clone())));
    }
    let (Some(items), Some(component)) = (sequence.as_sequence(), array_type.component_type())
    else {
        return Ok(None);
    };
    let size = items.size()?;
    let array = HostArray::new(component.clone(), Vec::with_capacity(size));
    stops.insert(identity, array.clone());
    let filled = (|| -> Result<bool> {
        for index in 0..size {
            let item = items.get(index)?;
            if item.is_none() && index >= items.size()? {
                break;
            }
            let value = try_unwrap(item.as_ref(), component, TypeFlags::empty(), stops)?
                .map(|unwrapped| unwrapped.value)
                .filter(|value| !(value.is_null() && component.is_primitive()));
            match value {
                Some(value) => array.push(value),
                None if try_only => return Ok(false),
                None => {
                    return Err(Error::SequenceItemType {
                        target: array_type.short_name(),
                        component: component.short_name(),
                        index,
                        item_type: model::type_description(item.as_ref()),
                    });
                }
            }
        }
        Ok(true)
    })();
    stops.remove(&identity);
    Ok(filled?.then_some(HostValue::Array(array)))
}

fn cannot_unwrap(model: Option<&ModelRef>, target: &JType) -> Error {
    Error::CannotUnwrap {
        model_type: model::type_description(model),
        target: target.java_name(),
    }
}

/// Errors of lazily unwrapped container items surface to host code as unchecked exceptions.
fn to_host_error(error: Error) -> HostError {
    HostError::new("java.lang.reflect.UndeclaredThrowableException", error.to_string())
}

fn unwrap_item(item: Option<ModelRef>) -> HostResult<HostValue> {
    unwrap(item.as_ref()).map_err(to_host_error)
}

/// A hash handed to host code as a `java.util.Map`.
pub struct HashAdapter {
    model: ModelRef,
}

impl HashAdapter {
    fn host_value(model: &ModelRef) -> HostValue {
        HostValue::Map(Arc::new(HashAdapter {
            model: Arc::clone(model),
        }))
    }
}

impl MapAccess for HashAdapter {
    fn size(&self) -> usize {
        match self.model.as_hash_ex().map(|hash| hash.size()) {
            Some(Ok(size)) => size,
            Some(Err(error)) => {
                debug!(%error, "size of adapted hash is unknown");
                0
            }
            None => 0,
        }
    }

    fn get(&self, key: &str) -> HostResult<Option<HostValue>> {
        let hash = self
            .model
            .as_hash()
            .ok_or_else(|| HostError::illegal_state("adapted model is not a hash"))?;
        match hash.get(key).map_err(to_host_error)? {
            Some(value) => unwrap_item(Some(value)).map(Some),
            None => Ok(None),
        }
    }

    fn keys(&self) -> HostResult<Vec<Arc<str>>> {
        let hash = self.model.as_hash_ex().ok_or_else(|| {
            HostError::new(
                "java.lang.UnsupportedOperationException",
                format!(
                    "the keys of a {} can't be listed",
                    model::type_description(Some(&self.model))
                ),
            )
        })?;
        hash.keys().map_err(to_host_error)
    }

    fn template_model(&self) -> Option<ModelRef> {
        Some(Arc::clone(&self.model))
    }
}

/// A sequence handed to host code as a `java.util.List`.
pub struct SequenceAdapter {
    model: ModelRef,
}

impl SequenceAdapter {
    fn host_value(model: &ModelRef) -> HostValue {
        HostValue::List(Arc::new(SequenceAdapter {
            model: Arc::clone(model),
        }))
    }
}

impl ListAccess for SequenceAdapter {
    fn size(&self) -> usize {
        match self.model.as_sequence().map(|sequence| sequence.size()) {
            Some(Ok(size)) => size,
            Some(Err(error)) => {
                debug!(%error, "size of adapted sequence is unknown");
                0
            }
            None => 0,
        }
    }

    fn get(&self, index: usize) -> HostResult<HostValue> {
        let sequence = self
            .model
            .as_sequence()
            .ok_or_else(|| HostError::illegal_state("adapted model is not a sequence"))?;
        unwrap_item(sequence.get(index).map_err(to_host_error)?)
    }

    fn template_model(&self) -> Option<ModelRef> {
        Some(Arc::clone(&self.model))
    }
}

fn collection_items(model: &ModelRef) -> HostResult<Vec<HostValue>> {
    let collection = model
        .as_collection()
        .ok_or_else(|| HostError::illegal_state("adapted model is not a collection"))?;
    collection
        .items()
        .map_err(to_host_error)?
        .into_iter()
        .map(unwrap_item)
        .collect()
}

/// A collection handed to host code as a `java.util.Set`.
pub struct SetAdapter {
    model: ModelRef,
}

impl SetAdapter {
    fn host_value(model: &ModelRef) -> HostValue {
        HostValue::Set(Arc::new(SetAdapter {
            model: Arc::clone(model),
        }))
    }
}

impl CollectionAccess for SetAdapter {
    fn size(&self) -> usize {
        self.values().map_or(0, |values| values.len())
    }

    fn values(&self) -> HostResult<Vec<HostValue>> {
        let mut values: Vec<HostValue> = vec![];
        for value in collection_items(&self.model)? {
            if !values.contains(&value) {
                values.push(value);
            }
        }
        Ok(values)
    }

    fn template_model(&self) -> Option<ModelRef> {
        Some(Arc::clone(&self.model))
    }
}

/// A collection handed to host code as a plain `java.util.Collection`.
pub struct CollectionAdapter {
    model: ModelRef,
}

impl CollectionAdapter {
    fn host_value(model: &ModelRef) -> HostValue {
        HostValue::Set(Arc::new(CollectionAdapter {
            model: Arc::clone(model),
        }))
    }
}

impl CollectionAccess for CollectionAdapter {
    fn size(&self) -> usize {
        self.values().map_or(0, |values| values.len())
    }

    fn values(&self) -> HostResult<Vec<HostValue>> {
        collection_items(&self.model)
    }

    fn class(&self) -> &'static Arc<Class> {
        famous_classes::abstract_collection_class()
    }

    fn template_model(&self) -> Option<ModelRef> {
        Some(Arc::clone(&self.model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{
            SimpleHash, SimpleNumber, SimpleScalar, SimpleSequence, TemplateModel,
            TemplateSequenceModel,
        },
        runtime::{Number, PrimitiveType},
    };
    use once_cell::sync::OnceCell;
    use pretty_assertions::assert_eq;

    fn class(c: &Arc<Class>) -> JType {
        JType::class(c)
    }

    fn scalar(s: &str) -> Option<ModelRef> {
        Some(Arc::new(SimpleScalar::new(s)))
    }

    fn number(n: Number) -> Option<ModelRef> {
        Some(Arc::new(SimpleNumber::new(n)))
    }

    #[test]
    fn final_targets_allow_a_single_conversion() {
        let string = class(famous_classes::string_class());
        assert_eq!(
            try_unwrap_to(scalar("a").as_ref(), &string, TypeFlags::empty()).unwrap(),
            Some(HostValue::string("a"))
        );
        assert_eq!(
            try_unwrap_to(number(Number::Int(1)).as_ref(), &string, TypeFlags::empty()).unwrap(),
            None
        );
        let char_type = JType::Primitive(PrimitiveType::Char);
        assert_eq!(
            try_unwrap_to(scalar("x").as_ref(), &char_type, TypeFlags::empty()).unwrap(),
            Some(HostValue::Char('x'))
        );
        assert_eq!(
            try_unwrap_to(scalar("xy").as_ref(), &char_type, TypeFlags::empty()).unwrap(),
            None
        );
    }

    #[test]
    fn numbers_are_forced_to_numerical_targets() {
        let long = JType::Primitive(PrimitiveType::Long);
        assert_eq!(
            try_unwrap_to(number(Number::Int(3)).as_ref(), &long, TypeFlags::empty()).unwrap(),
            Some(HostValue::Number(Number::Long(3)))
        );
        assert_eq!(unwrap(None).unwrap(), HostValue::Null);
    }

    #[test]
    fn flags_pick_among_capabilities() {
        let object = class(famous_classes::object_class());
        let unwrapped = try_unwrap_for_overload(
            scalar("c").as_ref(),
            &object,
            TypeFlags::CHARACTER | TypeFlags::ACCEPTS_STRING,
        )
        .unwrap()
        .unwrap();
        assert!(unwrapped.character_or_string);
        assert_eq!(
            try_unwrap_to(scalar("c").as_ref(), &object, TypeFlags::CHARACTER).unwrap(),
            Some(HostValue::Char('c'))
        );
        // nothing the flags allow fits, so the unrestricted round decides
        assert_eq!(
            try_unwrap_to(scalar("abc").as_ref(), &object, TypeFlags::ACCEPTS_NUMBER).unwrap(),
            Some(HostValue::string("abc"))
        );
    }

    #[test]
    fn containers_become_adapters() {
        let hash: ModelRef = Arc::new(SimpleHash::new([("a".into(), scalar("b"))]));
        let map = try_unwrap_to(Some(&hash), &class(famous_classes::map_class()), TypeFlags::empty())
            .unwrap()
            .unwrap();
        let HostValue::Map(map) = map else {
            panic!("not a map: {map:?}");
        };
        assert_eq!(map.get("a").unwrap(), Some(HostValue::string("b")));
        assert!(Arc::ptr_eq(&map.template_model().unwrap(), &hash));

        let sequence: ModelRef = Arc::new(SimpleSequence::new(vec![scalar("x"), None]));
        let list = try_unwrap_to(
            Some(&sequence),
            &class(famous_classes::collection_class()),
            TypeFlags::empty(),
        )
        .unwrap()
        .unwrap();
        let HostValue::List(list) = list else {
            panic!("not a list: {list:?}");
        };
        assert_eq!(list.to_vec().unwrap(), vec![HostValue::string("x"), HostValue::Null]);
    }

    #[test]
    fn sequence_to_array_reports_the_failing_item() {
        let sequence: ModelRef = Arc::new(SimpleSequence::new(vec![
            number(Number::Int(1)),
            scalar("two"),
        ]));
        let ints = JType::array_of(JType::Primitive(PrimitiveType::Int));
        assert_eq!(try_unwrap_to(Some(&sequence), &ints, TypeFlags::empty()).unwrap(), None);
        let error = unwrap_to(Some(&sequence), &ints).unwrap_err();
        assert!(
            matches!(&error, Error::SequenceItemType { index: 1, item_type, .. } if item_type == "string"),
            "{error}"
        );
    }

    /// A sequence whose only item is the sequence itself.
    struct SelfContaining {
        this: OnceCell<std::sync::Weak<SelfContaining>>,
    }

    impl TemplateModel for SelfContaining {
        fn as_sequence(&self) -> Option<&dyn TemplateSequenceModel> {
            Some(self)
        }
    }

    impl TemplateSequenceModel for SelfContaining {
        fn get(&self, index: usize) -> Result<Option<ModelRef>> {
            let this = self.this.get().and_then(|weak| weak.upgrade());
            Ok(this.filter(|_| index == 0).map(|this| this as ModelRef))
        }

        fn size(&self) -> Result<usize> {
            Ok(1)
        }
    }

    #[test]
    fn self_referential_sequence_reuses_the_partial_array() {
        let sequence = Arc::new(SelfContaining {
            this: OnceCell::new(),
        });
        sequence.this.set(Arc::downgrade(&sequence)).ok();
        let model: ModelRef = sequence;
        let object = class(famous_classes::object_class());
        let nested = JType::array_of(JType::array_of(object));
        let HostValue::Array(array) = unwrap_to(Some(&model), &nested).unwrap() else {
            panic!("not an array");
        };
        assert_eq!(array.len(), 1);
        let HostValue::Array(inner) = array.get(0).unwrap() else {
            panic!("item is not an array");
        };
        assert!(Arc::ptr_eq(&inner.items, &array.items));
    }

    /// Reports its length, then loses its last item on the first read.
    struct Shrinking {
        items: parking_lot::Mutex<Vec<Option<ModelRef>>>,
        shrunk: std::sync::atomic::AtomicBool,
    }

    impl TemplateModel for Shrinking {
        fn as_sequence(&self) -> Option<&dyn TemplateSequenceModel> {
            Some(self)
        }
    }

    impl TemplateSequenceModel for Shrinking {
        fn get(&self, index: usize) -> Result<Option<ModelRef>> {
            let mut items = self.items.lock();
            if !self.shrunk.swap(true, std::sync::atomic::Ordering::SeqCst) {
                items.pop();
            }
            Ok(items.get(index).cloned().flatten())
        }

        fn size(&self) -> Result<usize> {
            Ok(self.items.lock().len())
        }
    }

    fn shrinking(items: Vec<Option<ModelRef>>) -> ModelRef {
        Arc::new(Shrinking {
            items: parking_lot::Mutex::new(items),
            shrunk: Default::default(),
        })
    }

    #[test]
    fn shrinking_sequence_is_not_padded_with_nulls() {
        let strings = JType::array_of(class(famous_classes::string_class()));
        let sequence = shrinking(vec![scalar("a"), scalar("b"), scalar("c")]);
        let HostValue::Array(array) = unwrap_to(Some(&sequence), &strings).unwrap() else {
            panic!("not an array");
        };
        assert_eq!(array.len(), 2);
        assert_eq!(array.get(1), Some(HostValue::string("b")));

        let ints = JType::array_of(JType::Primitive(PrimitiveType::Int));
        let sequence = shrinking(vec![
            number(Number::Int(1)),
            number(Number::Int(2)),
            number(Number::Int(3)),
        ]);
        let HostValue::Array(array) = unwrap_to(Some(&sequence), &ints).unwrap() else {
            panic!("not an array");
        };
        assert_eq!(array.len(), 2);
    }

    #[test]
    fn null_items_inside_the_sequence_are_kept() {
        let strings = JType::array_of(class(famous_classes::string_class()));
        let sequence: ModelRef = Arc::new(SimpleSequence::new(vec![scalar("a"), None, scalar("c")]));
        let HostValue::Array(array) = unwrap_to(Some(&sequence), &strings).unwrap() else {
            panic!("not an array");
        };
        assert_eq!(array.len(), 3);
        assert_eq!(array.get(1), Some(HostValue::Null));
    }
}
