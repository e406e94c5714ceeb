//! Per-content-type wire metadata (JSON, XML, multipart) on models and properties.
//!
//! Options are written once per content family: a node that already carries JSON
//! options keeps them when another operation reaches it with JSON again.

use std::collections::HashSet;

use crate::context::SdkContext;
use crate::source::{Metadata, XmlMetadata};
use crate::types::{
    BuiltInKind, JsonSerializationOptions, MultipartOptions, PropertyKind, SdkTypeId, SdkTypeKind,
    XmlSerializationOptions,
};

fn mime_parts(content_type: &str) -> (String, String) {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.split_once('/') {
        Some((kind, sub)) => (kind.to_string(), sub.to_string()),
        None => (essence, String::new()),
    }
}

/// `application/json`, `text/json` or any `+json` suffix.
pub fn is_json(content_type: &str) -> bool {
    let (_, sub) = mime_parts(content_type);
    sub == "json" || sub.ends_with("+json")
}

pub fn is_xml(content_type: &str) -> bool {
    let (_, sub) = mime_parts(content_type);
    sub == "xml" || sub.ends_with("+xml")
}

pub fn is_multipart(content_type: &str) -> bool {
    mime_parts(content_type).0 == "multipart"
}

/// Attach serialization options for `content_types` to `ty` and everything it reaches.
pub fn attach(ctx: &mut SdkContext<'_>, ty: SdkTypeId, content_types: &[String]) {
    if content_types.is_empty() {
        return;
    }
    let mut walker = Walker {
        content_types,
        seen: HashSet::new(),
        ignore_subtypes: Vec::new(),
    };
    walker.walk(ctx, ty);
}

struct Walker<'c> {
    content_types: &'c [String],
    seen: HashSet<SdkTypeId>,
    ignore_subtypes: Vec<bool>,
}

impl Walker<'_> {
    fn walk(&mut self, ctx: &mut SdkContext<'_>, ty: SdkTypeId) {
        if self.seen.contains(&ty) {
            return;
        }
        let kind = ctx.graph.ty(ty).kind.clone();
        match kind {
            SdkTypeKind::Array { value_type } | SdkTypeKind::Dict { value_type, .. } => {
                self.walk(ctx, value_type);
                return;
            }
            SdkTypeKind::Model(_) | SdkTypeKind::Union { .. } | SdkTypeKind::Nullable { .. } => {}
            _ => return,
        }
        if self.ignore_subtypes.last() != Some(&true) {
            self.seen.insert(ty);
        }
        match kind {
            SdkTypeKind::Union { variants } => {
                for v in variants {
                    self.walk(ctx, v);
                }
            }
            SdkTypeKind::Nullable { inner } => self.walk(ctx, inner),
            SdkTypeKind::Model(data) => {
                set_model_options(ctx, ty, self.content_types);
                if let Some(base) = data.base_model {
                    self.ignore_subtypes.push(true);
                    self.walk(ctx, base);
                    self.ignore_subtypes.pop();
                }
                if self.ignore_subtypes.last() != Some(&true) {
                    self.ignore_subtypes.push(false);
                    for sub in data.discriminated_subtypes.values() {
                        self.walk(ctx, *sub);
                    }
                    self.ignore_subtypes.pop();
                }
                if let Some(additional) = data.additional_properties {
                    self.ignore_subtypes.push(false);
                    self.walk(ctx, additional);
                    self.ignore_subtypes.pop();
                }
                self.ignore_subtypes.push(false);
                for p in &data.properties {
                    let property_type = ctx.graph.property(*p).ty;
                    self.walk(ctx, property_type);
                }
                self.ignore_subtypes.pop();
            }
            _ => {}
        }
    }
}

fn set_model_options(ctx: &mut SdkContext<'_>, model: SdkTypeId, content_types: &[String]) {
    let source = ctx.source;
    let json = content_types.iter().any(|c| is_json(c));
    let xml = content_types.iter().any(|c| is_xml(c));
    let multipart = content_types.iter().any(|c| is_multipart(c));

    let node = ctx.graph.ty(model);
    let model_name = node.name.clone();
    let model_meta = node.raw.map(|r| source.meta(r));
    let properties = ctx.graph.model_properties(model);

    if let Some(data) = ctx.graph.model_mut(model) {
        if json && data.serialization_options.json.is_none() {
            data.serialization_options.json = Some(JsonSerializationOptions {
                name: model_name.clone(),
            });
        }
        if xml && data.serialization_options.xml.is_none() {
            data.serialization_options.xml = Some(xml_options(model_meta, &model_name));
        }
    }

    for p in properties {
        let property = ctx.graph.property(p);
        if property.kind != PropertyKind::Property {
            continue;
        }
        let meta = property.raw.map(|r| source.meta(r));
        let declared = property
            .raw
            .map(|r| source.name(r).to_string())
            .unwrap_or_else(|| property.name.clone());
        let property_type = ctx.graph.strip_nullable(property.ty);

        let json_options = (json && property.serialization_options.json.is_none()).then(|| {
            JsonSerializationOptions {
                name: meta
                    .and_then(|m| m.encoded_name("application/json"))
                    .map(str::to_string)
                    .unwrap_or_else(|| declared.clone()),
            }
        });

        let xml_property = (xml && property.serialization_options.xml.is_none()).then(|| {
            let mut options = xml_options(meta, &declared);
            if let SdkTypeKind::Array { value_type } = ctx.graph.ty(property_type).kind {
                if options.unwrapped {
                    options.items_name = Some(options.name.clone());
                    options.items_ns = options.ns.clone();
                } else {
                    let item = ctx.graph.ty(value_type);
                    match item.raw.filter(|_| !item.name.is_empty()) {
                        Some(item_raw) => {
                            let item_options = xml_options(Some(source.meta(item_raw)), &item.name);
                            options.items_name = Some(item_options.name);
                            options.items_ns = item_options.ns;
                        }
                        None => {
                            options.items_name = Some(options.name.clone());
                            options.items_ns = options.ns.clone();
                        }
                    }
                }
            }
            options
        });

        let multipart_options = (multipart && property.serialization_options.multipart.is_none())
            .then(|| multipart_options(ctx, meta, &property.serialized_name, property_type));

        let property = ctx.graph.property_mut(p);
        if let Some(o) = json_options {
            property.serialization_options.json = Some(o);
        }
        if let Some(o) = xml_property {
            property.serialization_options.xml = Some(o);
        }
        if let Some(o) = multipart_options {
            property.serialization_options.multipart = Some(o);
        }
    }
}

fn xml_options(meta: Option<&Metadata>, declared: &str) -> XmlSerializationOptions {
    let xml: XmlMetadata = meta.and_then(|m| m.xml.clone()).unwrap_or_default();
    let name = meta
        .and_then(|m| m.encoded_name("application/xml"))
        .map(str::to_string)
        .or(xml.name)
        .unwrap_or_else(|| declared.to_string());
    XmlSerializationOptions {
        name,
        attribute: xml.attribute,
        ns: xml.ns,
        unwrapped: xml.unwrapped,
        items_name: None,
        items_ns: None,
    }
}

fn multipart_options(
    ctx: &SdkContext<'_>,
    meta: Option<&Metadata>,
    name: &str,
    ty: SdkTypeId,
) -> MultipartOptions {
    let part = meta.and_then(|m| m.multipart.clone()).unwrap_or_default();
    let (is_multi, element) = match ctx.graph.ty(ty).kind {
        SdkTypeKind::Array { value_type } => (true, value_type),
        _ => (false, ty),
    };
    let is_bytes = matches!(
        ctx.graph.ty(element).kind,
        SdkTypeKind::BuiltIn {
            builtin: BuiltInKind::Bytes,
            ..
        }
    );
    let is_file_part = part.file || is_bytes;
    let default_content_types = if !part.default_content_types.is_empty() {
        part.default_content_types
    } else if is_file_part {
        vec!["application/octet-stream".to_string()]
    } else if ctx.graph.model(element).is_some() {
        vec!["application/json".to_string()]
    } else {
        vec!["text/plain".to_string()]
    };
    MultipartOptions {
        name: name.to_string(),
        is_file_part,
        is_multi,
        default_content_types,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SdkContextOptions;
    use crate::resolver::resolve_type;
    use crate::source::{MultipartMetadata, SourceGraph, XmlNamespace};
    use pretty_assertions::assert_eq;

    #[test]
    fn mime_families() {
        assert!(is_json("application/json"));
        assert!(is_json("application/merge-patch+json; charset=utf-8"));
        assert!(!is_json("application/xml"));
        assert!(is_xml("text/xml"));
        assert!(is_xml("application/atom+xml"));
        assert!(is_multipart("multipart/form-data"));
        assert!(!is_multipart("application/json"));
    }

    #[test]
    fn json_names_follow_encoded_names() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let m = g.add_model("Widget", "Ns");
        let id = g.add_property(m, "id", s, false);
        g.meta_mut(id)
            .encoded_names
            .insert("application/json".into(), "ID".into());
        g.add_property(m, "name", s, false);
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let ty = resolve_type(&mut ctx, m, None);
        attach(&mut ctx, ty, &["application/json".to_string()]);
        let data = ctx.graph().model(ty).unwrap();
        assert_eq!(
            data.serialization_options.json.as_ref().map(|j| j.name.as_str()),
            Some("Widget")
        );
        let names: Vec<String> = data
            .properties
            .iter()
            .map(|p| {
                ctx.graph()[*p]
                    .serialization_options
                    .json
                    .as_ref()
                    .map(|j| j.name.clone())
                    .unwrap_or_default()
            })
            .collect();
        assert_eq!(names, vec!["ID".to_string(), "name".to_string()]);
    }

    #[test]
    fn attaching_twice_is_a_no_op() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let m = g.add_model("Widget", "Ns");
        g.add_property(m, "name", s, false);
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let ty = resolve_type(&mut ctx, m, None);
        attach(&mut ctx, ty, &["application/json".to_string()]);
        let first = ctx.graph().model(ty).unwrap().serialization_options.clone();
        let prop = ctx.graph().model_properties(ty)[0];
        ctx.graph.property_mut(prop).serialization_options.json = Some(JsonSerializationOptions {
            name: "kept".into(),
        });
        attach(&mut ctx, ty, &["application/json".to_string()]);
        assert_eq!(ctx.graph().model(ty).unwrap().serialization_options, first);
        assert_eq!(
            ctx.graph()[prop].serialization_options.json.as_ref().unwrap().name,
            "kept"
        );
    }

    #[test]
    fn xml_array_items() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let tag = g.add_model("Tag", "Ns");
        g.meta_mut(tag).xml = Some(XmlMetadata {
            name: Some("tag".into()),
            ns: Some(XmlNamespace {
                namespace: "http://example.com/ns".into(),
                prefix: "ex".into(),
            }),
            ..Default::default()
        });
        g.add_property(tag, "value", s, false);
        let tags = g.array_of(tag);
        let names = g.array_of(s);
        let m = g.add_model("Blob", "Ns");
        g.add_property(m, "tags", tags, false);
        let flat = g.add_property(m, "names", names, false);
        g.meta_mut(flat).xml = Some(XmlMetadata {
            unwrapped: true,
            ..Default::default()
        });
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let ty = resolve_type(&mut ctx, m, None);
        attach(&mut ctx, ty, &["application/xml".to_string()]);
        let props = ctx.graph().model_properties(ty);
        let wrapped = ctx.graph()[props[0]].serialization_options.xml.clone().unwrap();
        assert_eq!(wrapped.items_name.as_deref(), Some("tag"));
        assert_eq!(wrapped.items_ns.map(|n| n.prefix), Some("ex".to_string()));
        let unwrapped = ctx.graph()[props[1]].serialization_options.xml.clone().unwrap();
        assert!(unwrapped.unwrapped);
        assert_eq!(unwrapped.items_name.as_deref(), Some("names"));

        let tag_ty = resolve_type(&mut ctx, tag, None);
        assert_eq!(
            ctx.graph()
                .model(tag_ty)
                .unwrap()
                .serialization_options
                .xml
                .as_ref()
                .map(|x| x.name.as_str()),
            Some("tag")
        );
    }

    #[test]
    fn multipart_parts() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let bytes = g.std_scalar("bytes");
        let files = g.array_of(bytes);
        let m = g.add_model("Upload", "Ns");
        g.add_property(m, "name", s, false);
        g.add_property(m, "files", files, false);
        let avatar = g.add_property(m, "avatar", bytes, false);
        g.meta_mut(avatar).multipart = Some(MultipartMetadata {
            file: true,
            default_content_types: vec!["image/png".into()],
        });
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let ty = resolve_type(&mut ctx, m, None);
        attach(&mut ctx, ty, &["multipart/form-data".to_string()]);
        let parts: Vec<MultipartOptions> = ctx
            .graph()
            .model_properties(ty)
            .iter()
            .map(|p| ctx.graph()[*p].serialization_options.multipart.clone().unwrap())
            .collect();
        assert!(!parts[0].is_file_part);
        assert_eq!(parts[0].default_content_types, vec!["text/plain".to_string()]);
        assert!(parts[1].is_file_part && parts[1].is_multi);
        assert_eq!(parts[2].default_content_types, vec!["image/png".to_string()]);
    }

    #[test]
    fn walks_into_base_and_subtypes() {
        let mut g = SourceGraph::new();
        let s = g.std_scalar("string");
        let pet = g.add_model("Pet", "Ns");
        g.meta_mut(pet).discriminator = Some("kind".into());
        let dog = g.add_model("Dog", "Ns");
        let dog_kind = g.string_literal("dog");
        g.add_property(dog, "kind", dog_kind, false);
        g.add_property(dog, "bark", s, false);
        g.extend(dog, pet);
        let cat = g.add_model("Cat", "Ns");
        let cat_kind = g.string_literal("cat");
        g.add_property(cat, "kind", cat_kind, false);
        g.extend(cat, pet);
        let mut ctx = SdkContext::new(&g, SdkContextOptions::default());
        let pet_ty = resolve_type(&mut ctx, pet, None);
        let dog_ty = resolve_type(&mut ctx, dog, None);
        let cat_ty = resolve_type(&mut ctx, cat, None);

        attach(&mut ctx, pet_ty, &["application/json".to_string()]);
        for ty in [pet_ty, dog_ty, cat_ty] {
            assert!(ctx.graph().model(ty).unwrap().serialization_options.json.is_some());
        }
    }
}
