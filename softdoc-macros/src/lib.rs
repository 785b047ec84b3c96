//! Procedural macros for the softdoc project.
//!
//! - `#[derive(Document)]` implements `softdoc::document::Document`
//! - `#[derive(SoftDeletable)]` implements `softdoc::soft::SoftDeletable`
//!
//! ```ignore
//! #[derive(Debug, Clone, Serialize, Deserialize, Document, SoftDeletable)]
//! #[document(collection = "pilots", validate = Pilot::check)]
//! #[soft_delete(override_methods = "all", deleted_at, deleted_by, deleted_by_type = "string")]
//! pub struct Pilot {
//!     pub id: Uuid,
//!     pub name: String,
//!     #[serde(flatten)]
//!     #[deletion]
//!     pub deletion: DeletionState,
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as softdoc_macros;

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::{
    Data, DeriveInput, Expr, ExprArray, ExprLit, Fields, Ident, Lit, LitBool, Result,
    meta::ParseNestedMeta, parse_macro_input,
};

const METHODS: [(&str, &str); 9] = [
    ("count", "Count"),
    ("countDocuments", "CountDocuments"),
    ("find", "Find"),
    ("findOne", "FindOne"),
    ("findOneAndUpdate", "FindOneAndUpdate"),
    ("update", "Update"),
    ("updateOne", "UpdateOne"),
    ("updateMany", "UpdateMany"),
    ("aggregate", "Aggregate"),
];

const INDEX_FIELDS: [(&str, &str); 3] = [
    ("deleted", "Deleted"),
    ("deletedAt", "DeletedAt"),
    ("deletedBy", "DeletedBy"),
];

const DELETED_BY_TYPES: [(&str, &str); 4] = [
    ("objectId", "ObjectId"),
    ("string", "String"),
    ("uuid", "Uuid"),
    ("any", "Any"),
];

/// Derives `Document`.
///
/// # Attributes
///
/// - `#[document(collection = "name")]` - Collection name (required)
/// - `#[document(validate = path)]` - Function `fn(&Self) -> DocumentStoreResult<()>` run before saves
/// - `#[document(id)]` on a field - The identifier field; defaults to the field named `id`
#[proc_macro_derive(Document, attributes(document))]
pub fn derive_document(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    derive_document_impl(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

/// Derives `SoftDeletable`.
///
/// The field holding the `DeletionState` is marked `#[deletion]`, or named `deletion`.
///
/// # Attributes
///
/// `#[soft_delete(...)]` mirrors the soft-delete options:
///
/// - `override_methods = "all"` or `override_methods = ["find", "count"]`
/// - `deleted_at`, `deleted_by` (flags, or `= bool`)
/// - `deleted_by_type = "objectId" | "string" | "uuid" | "any"`
/// - `index_fields = "all"` or `index_fields = ["deleted"]`
/// - `validate_before_delete = bool`, `validate_before_restore = bool`
/// - `use_ne_operator = bool`
///
/// Unknown method or field names are compile errors.
#[proc_macro_derive(SoftDeletable, attributes(soft_delete, deletion))]
pub fn derive_soft_deletable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    derive_soft_deletable_impl(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

fn named_fields(input: &DeriveInput) -> Result<&syn::FieldsNamed> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(fields),
            _ => Err(syn::Error::new_spanned(&input.ident, "expected a struct with named fields")),
        },
        _ => Err(syn::Error::new_spanned(&input.ident, "expected a struct")),
    }
}

/// The field carrying `marker`, or else the field called `fallback`.
fn find_field(input: &DeriveInput, marker: impl Fn(&syn::Field) -> bool, fallback: &str) -> Result<Ident> {
    let fields = named_fields(input)?;

    fields
        .named
        .iter()
        .find(|field| marker(field))
        .or_else(|| {
            fields
                .named
                .iter()
                .find(|field| field.ident.as_ref().is_some_and(|ident| ident == fallback))
        })
        .and_then(|field| field.ident.clone())
        .ok_or_else(|| {
            syn::Error::new_spanned(
                &input.ident,
                format!("no `{fallback}` field found; mark one explicitly"),
            )
        })
}

fn derive_document_impl(input: DeriveInput) -> Result<TokenStream2> {
    let mut collection = None;
    let mut validate = None;

    for attr in &input.attrs {
        if !attr.path().is_ident("document") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("collection") {
                let value: syn::LitStr = meta.value()?.parse()?;
                collection = Some(value.value());
                Ok(())
            } else if meta.path.is_ident("validate") {
                let value: syn::ExprPath = meta.value()?.parse()?;
                validate = Some(value);
                Ok(())
            } else {
                Err(meta.error("unsupported document attribute"))
            }
        })?;
    }

    let collection = collection.ok_or_else(|| {
        syn::Error::new_spanned(&input.ident, "document attribute requires 'collection' parameter")
    })?;

    let id = find_field(
        &input,
        |field| {
            field.attrs.iter().any(|attr| {
                attr.path().is_ident("document")
                    && attr.parse_args::<Ident>().is_ok_and(|ident| ident == "id")
            })
        },
        "id",
    )?;

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let validate = validate.map(|path| {
        quote! {
            fn validate(&self) -> ::softdoc::error::DocumentStoreResult<()> {
                #path(self)
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::softdoc::document::Document for #name #ty_generics #where_clause {
            fn id(&self) -> &::softdoc::bson::Uuid {
                &self.#id
            }

            fn collection_name() -> &'static str {
                #collection
            }

            #validate
        }
    })
}

/// Resolves a configuration name against a lookup table.
fn variant(table: &[(&str, &str)], name: &str, span: Span, option: &str) -> Result<Ident> {
    table
        .iter()
        .find(|(config, _)| *config == name)
        .map(|(_, variant)| Ident::new(variant, span))
        .ok_or_else(|| syn::Error::new(span, format!("unknown {option} entry `{name}`")))
}

/// A `"all"` or `["a", "b"]` selection.
enum Selection {
    All,
    Names(Vec<syn::LitStr>),
}

fn parse_selection(meta: &ParseNestedMeta) -> Result<Selection> {
    let expr: Expr = meta.value()?.parse()?;

    match expr {
        Expr::Lit(ExprLit { lit: Lit::Str(value), .. }) if value.value() == "all" => Ok(Selection::All),
        Expr::Lit(ExprLit { lit: Lit::Str(value), .. }) => Ok(Selection::Names(vec![value])),
        Expr::Array(ExprArray { elems, .. }) => elems
            .into_iter()
            .map(|elem| match elem {
                Expr::Lit(ExprLit { lit: Lit::Str(value), .. }) => Ok(value),
                other => Err(syn::Error::new_spanned(other, "expected a string literal")),
            })
            .collect::<Result<Vec<_>>>()
            .map(Selection::Names),
        other => Err(syn::Error::new_spanned(other, "expected \"all\" or a list of names")),
    }
}

/// A bare flag means `true`; `flag = false` is also accepted.
fn parse_flag(meta: &ParseNestedMeta) -> Result<bool> {
    if meta.input.peek(syn::Token![=]) {
        let value: LitBool = meta.value()?.parse()?;
        Ok(value.value)
    } else {
        Ok(true)
    }
}

fn derive_soft_deletable_impl(input: DeriveInput) -> Result<TokenStream2> {
    let mut calls = Vec::new();

    for attr in &input.attrs {
        if !attr.path().is_ident("soft_delete") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            let Some(key) = meta.path.get_ident().map(Ident::to_string) else {
                return Err(meta.error("unsupported soft_delete attribute"));
            };

            match key.as_str() {
                "override_methods" => calls.push(match parse_selection(&meta)? {
                    Selection::All => quote! { .override_all() },
                    Selection::Names(names) => {
                        let methods = names
                            .iter()
                            .map(|name| variant(&METHODS, &name.value(), name.span(), "override_methods"))
                            .collect::<Result<Vec<_>>>()?;
                        quote! { .override_methods([#(::softdoc::soft::Method::#methods),*]) }
                    }
                }),
                "index_fields" => calls.push(match parse_selection(&meta)? {
                    Selection::All => quote! { .index_all() },
                    Selection::Names(names) => {
                        let fields = names
                            .iter()
                            .map(|name| variant(&INDEX_FIELDS, &name.value(), name.span(), "index_fields"))
                            .collect::<Result<Vec<_>>>()?;
                        quote! { .index_fields([#(::softdoc::soft::IndexField::#fields),*]) }
                    }
                }),
                "deleted_by_type" => {
                    let value: syn::LitStr = meta.value()?.parse()?;
                    let kind = variant(&DELETED_BY_TYPES, &value.value(), value.span(), "deleted_by_type")?;
                    calls.push(quote! { .deleted_by_type(::softdoc::soft::DeletedByType::#kind) });
                }
                "deleted_at" | "deleted_by" | "validate_before_delete" | "validate_before_restore"
                | "use_ne_operator" => {
                    let enabled = parse_flag(&meta)?;
                    let setter = format_ident!("{}", key);
                    calls.push(quote! { .#setter(#enabled) });
                }
                _ => return Err(meta.error("unsupported soft_delete attribute")),
            }

            Ok(())
        })?;
    }

    let deletion = find_field(
        &input,
        |field| field.attrs.iter().any(|attr| attr.path().is_ident("deletion")),
        "deletion",
    )?;

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::softdoc::soft::SoftDeletable for #name #ty_generics #where_clause {
            fn deletion(&self) -> &::softdoc::soft::DeletionState {
                &self.#deletion
            }

            fn deletion_mut(&mut self) -> &mut ::softdoc::soft::DeletionState {
                &mut self.#deletion
            }

            fn soft_delete_options() -> ::softdoc::soft::SoftDeleteOptions {
                ::softdoc::soft::SoftDeleteOptions::builder()
                    #(#calls)*
                    .build()
            }
        }
    })
}
