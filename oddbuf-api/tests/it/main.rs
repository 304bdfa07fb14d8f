mod parity;
mod reqrep;
