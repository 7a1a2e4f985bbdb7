//! `#[derive(Content)]`: generates a [`stache::Content`] impl for a struct
//! that resolves each named field by its own name, matching on the field's
//! precomputed FNV hash first (the same hash `stache::Segment` carries) and
//! falling back to a string comparison only to rule out a collision, the
//! same two-step lookup the renderer itself uses when matching a path
//! segment against known fields.

#![recursion_limit = "256"]

extern crate proc_macro;

use std::hash::Hasher;

use fnv::FnvHasher;
use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::token::Comma;
use syn::{parse_macro_input, Data, DeriveInput, Field, Fields, Index};

fn hash_name(name: &str) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(name.as_bytes());
    hasher.finish()
}

struct NamedField {
    name: String,
    hash: u64,
    accessor: proc_macro2::TokenStream,
}

fn collect_fields(fields: &Fields) -> Vec<NamedField> {
    let named: Punctuated<Field, Comma> = Punctuated::new();

    let iter: Box<dyn Iterator<Item = &Field>> = match fields {
        Fields::Named(fields) => Box::new(fields.named.iter()),
        Fields::Unnamed(fields) => Box::new(fields.unnamed.iter()),
        Fields::Unit => Box::new(named.iter()),
    };

    iter.enumerate()
        .map(|(index, field)| {
            let (name, accessor) = match &field.ident {
                Some(ident) => (ident.to_string(), quote!(#ident)),
                None => {
                    let idx = Index::from(index);
                    (index.to_string(), quote!(#idx))
                }
            };

            let hash = hash_name(&name);

            NamedField { name, hash, accessor }
        })
        .collect()
}

/// Derives [`stache::Content`] for a struct, matching `{{field}}` tags
/// against its field names.
#[proc_macro_derive(Content)]
pub fn derive_content(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => collect_fields(&data.fields),
        _ => panic!("#[derive(Content)] can only be applied to structs"),
    };

    let get_field_arms = fields.iter().map(|f| {
        let NamedField { name, hash, accessor } = f;
        quote! {
            #hash if segment.name == #name => Some(&self.#accessor as &dyn stache::Content),
        }
    });

    let render_escaped_arms = fields.iter().map(|f| {
        let NamedField { name, hash, accessor } = f;
        quote! {
            #hash if segment.name == #name => {
                self.#accessor.render_escaped(stack, encoder).map(|_| true)
            }
        }
    });

    let render_unescaped_arms = fields.iter().map(|f| {
        let NamedField { name, hash, accessor } = f;
        quote! {
            #hash if segment.name == #name => {
                self.#accessor.render_unescaped(stack, encoder).map(|_| true)
            }
        }
    });

    let render_section_arms = fields.iter().map(|f| {
        let NamedField { name, hash, accessor } = f;
        quote! {
            #hash if segment.name == #name => {
                self.#accessor.render_section(section, stack, encoder).map(|_| true)
            }
        }
    });

    let render_inverse_arms = fields.iter().map(|f| {
        let NamedField { name, hash, accessor } = f;
        quote! {
            #hash if segment.name == #name => {
                self.#accessor.render_inverse(section, stack, encoder).map(|_| true)
            }
        }
    });

    let capacity_hint_terms = fields.iter().map(|f| {
        let accessor = &f.accessor;
        quote! { + stache::Content::capacity_hint(&self.#accessor) }
    });

    let tokens = quote! {
        #[automatically_derived]
        impl #impl_generics stache::Content for #name #ty_generics #where_clause {
            fn capacity_hint(&self) -> usize {
                0 #( #capacity_hint_terms )*
            }

            fn get_field(&self, segment: stache::Segment<'_>) -> Option<&dyn stache::Content> {
                match segment.hash {
                    #( #get_field_arms )*
                    _ => None,
                }
            }

            fn render_field_escaped<'stack>(
                &'stack self,
                segment: stache::Segment<'_>,
                stack: &stache::Stack<'stack>,
                encoder: &mut dyn stache::Encoder,
            ) -> stache::Result<bool> {
                match segment.hash {
                    #( #render_escaped_arms )*
                    _ => Ok(false),
                }
            }

            fn render_field_unescaped<'stack>(
                &'stack self,
                segment: stache::Segment<'_>,
                stack: &stache::Stack<'stack>,
                encoder: &mut dyn stache::Encoder,
            ) -> stache::Result<bool> {
                match segment.hash {
                    #( #render_unescaped_arms )*
                    _ => Ok(false),
                }
            }

            fn render_field_section<'stack>(
                &'stack self,
                segment: stache::Segment<'_>,
                section: stache::Section<'_, 'stack>,
                stack: &stache::Stack<'stack>,
                encoder: &mut dyn stache::Encoder,
            ) -> stache::Result<bool> {
                match segment.hash {
                    #( #render_section_arms )*
                    _ => Ok(false),
                }
            }

            fn render_field_inverse<'stack>(
                &'stack self,
                segment: stache::Segment<'_>,
                section: stache::Section<'_, 'stack>,
                stack: &stache::Stack<'stack>,
                encoder: &mut dyn stache::Encoder,
            ) -> stache::Result<bool> {
                match segment.hash {
                    #( #render_inverse_arms )*
                    _ => Ok(false),
                }
            }
        }
    };

    TokenStream::from(tokens)
}
