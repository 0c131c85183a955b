//! Procedural macros for schema_drift
//!
//! `#[derive(DeclaredTable)]` turns a struct with named fields into a
//! `schema_drift::models::DeclaredEntity`, so the struct itself declares the
//! table the application expects.
//!
//! ```ignore
//! #[derive(DeclaredTable)]
//! #[drift(table = "orders", index(name = "ix_orders_status", columns = "status, id"))]
//! struct Order {
//!     id: i64,
//!     #[drift(db_type = "VARCHAR(20)", default = "'new'")]
//!     status: String,
//!     note: Option<String>,
//!     #[drift(skip)]
//!     cached_total: f64,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, ToTokens};
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Fields, GenericArgument, LitStr,
    PathArguments, Type,
};

/// Struct-level `#[drift(...)]` options
#[derive(Default)]
struct TableArgs {
    table: Option<String>,
    indexes: Vec<IndexArgs>,
}

struct IndexArgs {
    name: String,
    columns: Vec<String>,
    unique: bool,
}

/// Field-level `#[drift(...)]` options
#[derive(Default)]
struct FieldArgs {
    column: Option<String>,
    db_type: Option<String>,
    default: Option<String>,
    nullable: bool,
    unique: bool,
    skip: bool,
}

fn parse_table_args(attrs: &[Attribute]) -> syn::Result<TableArgs> {
    let mut args = TableArgs::default();

    for attr in attrs.iter().filter(|a| a.path().is_ident("drift")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value: LitStr = meta.value()?.parse()?;
                args.table = Some(value.value());
                Ok(())
            } else if meta.path.is_ident("index") {
                let mut name = None;
                let mut columns = Vec::new();
                let mut unique = false;

                meta.parse_nested_meta(|inner| {
                    if inner.path.is_ident("name") {
                        let value: LitStr = inner.value()?.parse()?;
                        name = Some(value.value());
                    } else if inner.path.is_ident("columns") {
                        let value: LitStr = inner.value()?.parse()?;
                        columns = value
                            .value()
                            .split(',')
                            .map(|c| c.trim().to_string())
                            .filter(|c| !c.is_empty())
                            .collect();
                    } else if inner.path.is_ident("unique") {
                        unique = true;
                    } else {
                        return Err(inner.error("expected `name`, `columns` or `unique`"));
                    }
                    Ok(())
                })?;

                let name = name.ok_or_else(|| meta.error("index needs a `name`"))?;
                if columns.is_empty() {
                    return Err(meta.error("index needs at least one column"));
                }
                args.indexes.push(IndexArgs { name, columns, unique });
                Ok(())
            } else {
                Err(meta.error("unsupported drift attribute on a struct"))
            }
        })?;
    }

    Ok(args)
}

fn parse_field_args(attrs: &[Attribute]) -> syn::Result<FieldArgs> {
    let mut args = FieldArgs::default();

    for attr in attrs.iter().filter(|a| a.path().is_ident("drift")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("column") {
                args.column = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("db_type") {
                args.db_type = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("default") {
                args.default = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("nullable") {
                args.nullable = true;
            } else if meta.path.is_ident("unique") {
                args.unique = true;
            } else if meta.path.is_ident("skip") {
                args.skip = true;
            } else {
                return Err(meta.error("unsupported drift attribute on a field"));
            }
            Ok(())
        })?;
    }

    Ok(args)
}

/// The `T` of an `Option<T>` field
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }

    match &segment.arguments {
        PathArguments::AngleBracketed(args) => args.args.iter().find_map(|arg| match arg {
            GenericArgument::Type(inner) => Some(inner),
            _ => None,
        }),
        _ => None,
    }
}

fn expand_declared_table(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "DeclaredTable only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "DeclaredTable only supports structs",
            ))
        }
    };

    let table_args = parse_table_args(&input.attrs)?;
    let table_name = match &table_args.table {
        Some(table) => quote! { #table.to_string() },
        None => quote! {
            ::schema_drift::utils::get_table_name(stringify!(#name), true)
        },
    };

    let mut columns = Vec::new();
    for field in fields {
        let args = parse_field_args(&field.attrs)?;
        if args.skip {
            continue;
        }

        let column_name = match (&args.column, &field.ident) {
            (Some(column), _) => column.clone(),
            (None, Some(ident)) => ident.to_string().trim_start_matches("r#").to_string(),
            (None, None) => continue,
        };

        let inner = option_inner(&field.ty);
        let nullable = args.nullable || inner.is_some();

        let data_type = match &args.db_type {
            Some(db_type) => quote! {
                ::schema_drift::schema::types::TypeDescriptor::parse(#db_type)
            },
            None => {
                let rust_type = inner.unwrap_or(&field.ty).to_token_stream().to_string();
                quote! { ::schema_drift::models::map_rust_type(#rust_type)? }
            }
        };

        let default = args.default.as_ref().map(|d| quote! { .default(#d) });

        columns.push(quote! {
            table.add_column(
                ::schema_drift::schema::types::ColumnModel::new(#column_name, #data_type)
                    .nullable(#nullable)
                    #default
            )?;
        });

        if args.unique {
            columns.push(quote! {
                table.add_index(::schema_drift::schema::types::IndexModel::new(
                    &::schema_drift::utils::get_index_name(
                        "ux_{table}_{columns}",
                        &table_name,
                        &[#column_name.to_string()],
                    ),
                    &[#column_name],
                    true,
                ))?;
            });
        }
    }

    let indexes = table_args.indexes.iter().map(|index| {
        let index_name = &index.name;
        let index_columns = &index.columns;
        let unique = index.unique;
        quote! {
            table.add_index(::schema_drift::schema::types::IndexModel::new(
                #index_name,
                &[#(#index_columns),*],
                #unique,
            ))?;
        }
    });

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::schema_drift::models::DeclaredEntity for #name #ty_generics #where_clause {
            fn entity_name() -> &'static str {
                stringify!(#name)
            }

            fn table_model() -> ::schema_drift::Result<::schema_drift::schema::types::TableModel> {
                let table_name: String = #table_name;
                let mut table = ::schema_drift::schema::types::TableModel::new(&table_name);
                #(#columns)*
                #(#indexes)*
                Ok(table)
            }
        }
    })
}

/// Derive macro declaring the table a struct expects
#[proc_macro_derive(DeclaredTable, attributes(drift))]
pub fn derive_declared_table(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand_declared_table(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
