use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, Ident, LitStr, Type};

pub fn derive_envelope(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let basic_field = find_basic_field(input)?;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::bus_rpc::Envelope for #name #ty_generics #where_clause {
            fn basic(&self) -> &::bus_rpc::BasicMessage {
                &self.#basic_field
            }

            fn basic_mut(&mut self) -> &mut ::bus_rpc::BasicMessage {
                &mut self.#basic_field
            }
        }
    })
}

fn find_basic_field(input: &DeriveInput) -> syn::Result<Ident> {
    let fields = match &input.data {
        Data::Struct(data_struct) => match &data_struct.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "Envelope derive only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Envelope derive only supports structs",
            ))
        }
    };

    if let Some(named) = parse_struct_attrs(input)? {
        let wanted = format_ident!("{}", named);
        return fields
            .iter()
            .filter_map(|field| field.ident.clone())
            .find(|ident| *ident == wanted)
            .ok_or_else(|| {
                syn::Error::new_spanned(
                    &input.ident,
                    format!("no field named `{}` for #[envelope(basic = ...)]", named),
                )
            });
    }

    fields
        .iter()
        .find(|field| is_basic_message(&field.ty))
        .and_then(|field| field.ident.clone())
        .ok_or_else(|| {
            syn::Error::new_spanned(
                &input.ident,
                "Envelope derive needs a `BasicMessage` field or #[envelope(basic = \"field\")]",
            )
        })
}

fn parse_struct_attrs(input: &DeriveInput) -> syn::Result<Option<String>> {
    let mut basic = None;

    for attr in &input.attrs {
        if !attr.path().is_ident("envelope") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("basic") {
                let value: LitStr = meta.value()?.parse()?;
                basic = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported envelope attribute"))
            }
        })?;
    }

    Ok(basic)
}

fn is_basic_message(ty: &Type) -> bool {
    match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map(|segment| segment.ident == "BasicMessage")
            .unwrap_or(false),
        _ => false,
    }
}
